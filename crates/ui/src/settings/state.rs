use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use schoolcatch_chat::RevealConfig;
use schoolcatch_transport::{ClientConfig, DEFAULT_ENDPOINT, DEFAULT_LANGUAGE};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const SETTINGS_DIRECTORY_NAME: &str = "schoolcatch";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const SETTINGS_ENV_PREFIX: &str = "SCHOOLCATCH_";

pub const DEFAULT_DISPLAY_NAME: &str = "준영";
pub const DEFAULT_NOTICE_URL: &str = "https://www.hansung.ac.kr/hansung/8385/subview.do?enc=Zm5jdDF8QEB8JTJGYmJzJTJGaGFuc3VuZyUyRjE0MyUyRmFydGNsTGlzdC5kbyUzRmJic0NsU2VxJTNEJTI2YmJzT3BlbldyZFNlcSUzRCUyNmlzVmlld01pbmUlM0RmYWxzZSUyNnNyY2hDb2x1bW4lM0RzaiUyNnNyY2hXcmQlM0QlMjY%3D";
pub const DEFAULT_HOMEPAGE_URL: &str = "https://www.hansung.ac.kr";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub endpoint: String,
    pub language: String,
    pub reveal_speed_ms: u64,
    pub text_update_throttle_ms: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Name used in the greeting and the conversation header.
    pub display_name: String,
    pub notice_url: String,
    pub homepage_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            reveal_speed_ms: 10,
            text_update_throttle_ms: 100,
            request_timeout_secs: 60,
            connect_timeout_secs: 5,
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            notice_url: DEFAULT_NOTICE_URL.to_string(),
            homepage_url: DEFAULT_HOMEPAGE_URL.to_string(),
        }
    }
}

impl Settings {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".schoolcatch"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    /// Loads settings from the default location, falling back to defaults on error.
    pub fn load() -> Self {
        Self::load_from(&Self::default_config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
        }

        match Self::try_load_from(path) {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!("{error}. using defaults");
                Self::default()
            }
        }
    }

    /// Defaults, then the JSON file at `path`, then `SCHOOLCATCH_*` variables.
    pub fn try_load_from(path: &Path) -> SettingsResult<Self> {
        let settings = Figment::from(Serialized::defaults(Self::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(SETTINGS_ENV_PREFIX))
            .extract::<Self>()
            .context(ExtractSnafu {
                stage: "extract-settings",
                path: path.to_path_buf(),
            })?;

        Ok(settings.normalized())
    }

    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();

        self.endpoint = non_blank_or(self.endpoint, defaults.endpoint);
        self.language = non_blank_or(self.language, defaults.language);
        self.display_name = non_blank_or(self.display_name, defaults.display_name);
        self.notice_url = non_blank_or(self.notice_url, defaults.notice_url);
        self.homepage_url = non_blank_or(self.homepage_url, defaults.homepage_url);

        // Zero-length intervals and timeouts are rejected by tokio and reqwest.
        self.reveal_speed_ms = self.reveal_speed_ms.max(1);
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.connect_timeout_secs = self.connect_timeout_secs.max(1);

        self
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.endpoint)
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
    }

    pub fn reveal_config(&self) -> RevealConfig {
        RevealConfig::new(
            Duration::from_millis(self.reveal_speed_ms),
            Duration::from_millis(self.text_update_throttle_ms),
        )
    }
}

pub type SettingsResult<T> = Result<T, SettingsError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to parse settings from {path:?} on `{stage}`: {source}"))]
    Extract {
        stage: &'static str,
        path: PathBuf,
        #[snafu(source(from(figment::Error, Box::new)))]
        source: Box<figment::Error>,
    },
}

fn non_blank_or(value: String, fallback: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let settings = Settings::try_load_from(Path::new("absent.json"))
                .expect("missing file is not an error");

            assert_eq!(settings, Settings::default());
            assert_eq!(settings.endpoint, "http://localhost:8000/api/chat/");
            assert_eq!(settings.language, "한국어");
            Ok(())
        });
    }

    #[test]
    fn file_values_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                SETTINGS_FILE_NAME,
                r#"{
                    "endpoint": "http://10.0.0.7:8000/api/chat/",
                    "reveal_speed_ms": 25,
                    "display_name": "민지"
                }"#,
            )?;

            let settings = Settings::try_load_from(Path::new(SETTINGS_FILE_NAME))
                .expect("settings parse");

            assert_eq!(settings.endpoint, "http://10.0.0.7:8000/api/chat/");
            assert_eq!(settings.reveal_speed_ms, 25);
            assert_eq!(settings.display_name, "민지");
            assert_eq!(settings.text_update_throttle_ms, 100);
            Ok(())
        });
    }

    #[test]
    fn environment_wins_over_file() {
        Jail::expect_with(|jail| {
            jail.create_file(SETTINGS_FILE_NAME, r#"{ "language": "English" }"#)?;
            jail.set_env("SCHOOLCATCH_LANGUAGE", "日本語");
            jail.set_env("SCHOOLCATCH_REQUEST_TIMEOUT_SECS", "15");

            let settings = Settings::try_load_from(Path::new(SETTINGS_FILE_NAME))
                .expect("settings parse");

            assert_eq!(settings.language, "日本語");
            assert_eq!(settings.request_timeout_secs, 15);
            assert_eq!(
                settings.client_config().request_timeout,
                Duration::from_secs(15)
            );
            Ok(())
        });
    }

    #[test]
    fn malformed_file_reports_error_and_load_falls_back() {
        Jail::expect_with(|jail| {
            jail.create_file(SETTINGS_FILE_NAME, r#"{ "reveal_speed_ms": "fast" }"#)?;
            let path = Path::new(SETTINGS_FILE_NAME);

            let error = Settings::try_load_from(path).expect_err("type mismatch");
            assert!(matches!(error, SettingsError::Extract { .. }));
            assert_eq!(Settings::load_from(path), Settings::default());
            Ok(())
        });
    }

    #[test]
    fn normalization_restores_blank_fields_and_clamps_intervals() {
        let settings = Settings {
            endpoint: "   ".to_string(),
            language: String::new(),
            display_name: "  지훈 ".to_string(),
            reveal_speed_ms: 0,
            request_timeout_secs: 0,
            connect_timeout_secs: 0,
            ..Settings::default()
        }
        .normalized();

        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.language, DEFAULT_LANGUAGE);
        assert_eq!(settings.display_name, "지훈");
        assert_eq!(settings.reveal_speed_ms, 1);
        assert_eq!(settings.request_timeout_secs, 1);
        assert_eq!(settings.connect_timeout_secs, 1);
    }

    #[test]
    fn reveal_config_uses_millisecond_fields() {
        let settings = Settings {
            reveal_speed_ms: 30,
            text_update_throttle_ms: 250,
            ..Settings::default()
        };

        let config = settings.reveal_config();
        assert_eq!(config.speed, Duration::from_millis(30));
        assert_eq!(config.text_update_throttle, Duration::from_millis(250));
    }
}
