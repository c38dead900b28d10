use snafu::Snafu;

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransportError {
    #[snafu(display("chat server at {endpoint} is unreachable on `{stage}`: {source}"))]
    ServerUnreachable {
        stage: &'static str,
        endpoint: String,
        source: reqwest::Error,
    },
    #[snafu(display("chat endpoint {endpoint} was not found (404)"))]
    EndpointNotFound {
        stage: &'static str,
        endpoint: String,
    },
    #[snafu(display("chat server reported an internal error (500)"))]
    ServerInternalError { stage: &'static str },
    #[snafu(display("chat server is temporarily unavailable (503)"))]
    ServerUnavailable { stage: &'static str },
    #[snafu(display("chat server returned status {status} {status_text}"))]
    ServerError {
        stage: &'static str,
        status: u16,
        status_text: String,
    },
    #[snafu(display("chat server rejected the question: {message}"))]
    ApplicationError {
        stage: &'static str,
        message: String,
    },
    #[snafu(display("unexpected chat response on `{stage}`: {details}"))]
    UnexpectedResponseShape {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("chat endpoint is not configured"))]
    MissingEndpoint { stage: &'static str },
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
}

/// Source-free classification of [`TransportError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    ServerUnreachable,
    EndpointNotFound,
    ServerInternalError,
    ServerUnavailable,
    ServerError,
    ApplicationError,
    UnexpectedResponseShape,
    Configuration,
}

impl TransportError {
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            Self::ServerUnreachable { .. } => TransportErrorKind::ServerUnreachable,
            Self::EndpointNotFound { .. } => TransportErrorKind::EndpointNotFound,
            Self::ServerInternalError { .. } => TransportErrorKind::ServerInternalError,
            Self::ServerUnavailable { .. } => TransportErrorKind::ServerUnavailable,
            Self::ServerError { .. } => TransportErrorKind::ServerError,
            Self::ApplicationError { .. } => TransportErrorKind::ApplicationError,
            Self::UnexpectedResponseShape { .. } => TransportErrorKind::UnexpectedResponseShape,
            Self::MissingEndpoint { .. } | Self::BuildClient { .. } => {
                TransportErrorKind::Configuration
            }
        }
    }

    /// Korean sentence shown to the user inside the chat transcript.
    pub fn user_message(&self) -> String {
        match self {
            Self::ServerUnreachable { .. } => {
                "서버에 연결할 수 없습니다. 서버가 실행 중인지 확인해주세요.".to_string()
            }
            Self::EndpointNotFound { .. } => {
                "서버를 찾을 수 없습니다. 서버가 실행 중인지 확인해주세요.".to_string()
            }
            Self::ServerInternalError { .. } => "서버 내부 오류가 발생했습니다.".to_string(),
            Self::ServerUnavailable { .. } => "서버가 일시적으로 사용할 수 없습니다.".to_string(),
            Self::ServerError {
                status,
                status_text,
                ..
            } => format!("서버 오류 ({status}): {status_text}"),
            Self::ApplicationError { message, .. } => message.clone(),
            Self::UnexpectedResponseShape { .. } => {
                "서버에서 예상치 못한 응답을 받았습니다.".to_string()
            }
            Self::MissingEndpoint { .. } | Self::BuildClient { .. } => {
                format!("클라이언트 설정 오류: {self}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_status_message_embeds_code_and_reason() {
        let error = ServerSnafu {
            stage: "test",
            status: 418u16,
            status_text: "I'm a teapot",
        }
        .build();

        assert_eq!(error.kind(), TransportErrorKind::ServerError);
        assert_eq!(error.user_message(), "서버 오류 (418): I'm a teapot");
    }

    #[test]
    fn construction_failures_are_configuration_errors() {
        let error = MissingEndpointSnafu { stage: "test" }.build();

        assert_eq!(error.kind(), TransportErrorKind::Configuration);
        assert!(error.user_message().starts_with("클라이언트 설정 오류"));
    }
}
