use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::StatusCode;
use snafu::{ResultExt, ensure};

use crate::error::{
    BuildClientSnafu, EndpointNotFoundSnafu, MissingEndpointSnafu, ServerInternalSnafu,
    ServerSnafu, ServerUnavailableSnafu, ServerUnreachableSnafu, TransportError,
    TransportResult, UnexpectedResponseShapeSnafu,
};
use crate::wire::{ChatRequest, ChatResponse};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api/chat/";
pub const DEFAULT_LANGUAGE: &str = "한국어";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub endpoint: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim().to_string(),
            ..Self::default()
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// One question in, one answer out.
///
/// Implementations must map every failure onto [`TransportError`]; callers never
/// see raw transport errors.
pub trait ChatClient: Send + Sync {
    fn post(&self, request: ChatRequest) -> BoxFuture<'_, TransportResult<String>>;
}

pub struct HttpChatClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpChatClient {
    pub fn new(config: ClientConfig) -> TransportResult<Self> {
        ensure!(
            !config.endpoint.is_empty(),
            MissingEndpointSnafu {
                stage: "http-client-new",
            }
        );

        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .context(BuildClientSnafu {
                stage: "build-http-client",
            })?;

        Ok(Self {
            http,
            endpoint: config.endpoint,
        })
    }

    async fn send_request(&self, request: ChatRequest) -> TransportResult<String> {
        tracing::debug!(
            endpoint = %self.endpoint,
            session_id = %request.session_id,
            language = %request.language,
            message_chars = request.message.chars().count(),
            "posting chat question"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .context(ServerUnreachableSnafu {
                stage: "send-chat-request",
                endpoint: self.endpoint.clone(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.status_error(status));
        }

        let body = response.text().await.map_err(|source| {
            UnexpectedResponseShapeSnafu {
                stage: "read-chat-response-body",
                details: source.to_string(),
            }
            .build()
        })?;

        ChatResponse::parse_answer(&body)
    }

    fn status_error(&self, status: StatusCode) -> TransportError {
        let stage = "chat-http-status";
        match status {
            StatusCode::NOT_FOUND => EndpointNotFoundSnafu {
                stage,
                endpoint: self.endpoint.clone(),
            }
            .build(),
            StatusCode::INTERNAL_SERVER_ERROR => ServerInternalSnafu { stage }.build(),
            StatusCode::SERVICE_UNAVAILABLE => ServerUnavailableSnafu { stage }.build(),
            _ => ServerSnafu {
                stage,
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default(),
            }
            .build(),
        }
    }
}

impl ChatClient for HttpChatClient {
    fn post(&self, request: ChatRequest) -> BoxFuture<'_, TransportResult<String>> {
        Box::pin(async move {
            let result = self.send_request(request).await;
            if let Err(error) = &result {
                tracing::warn!(kind = ?error.kind(), "chat request failed: {error}");
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportErrorKind;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpChatClient {
        HttpChatClient::new(ClientConfig::new(format!("{}/api/chat/", server.uri())))
            .expect("client builds")
    }

    fn question() -> ChatRequest {
        ChatRequest::new("수강신청 기간 알려줘", "session_1700000000000_abc123xyz", "한국어")
    }

    async fn respond_with(status: u16) -> TransportError {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat/"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        client_for(&server).post(question()).await.unwrap_err()
    }

    #[tokio::test]
    async fn posts_json_body_and_returns_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat/"))
            .and(header("content-type", "application/json"))
            .and(body_json(serde_json::json!({
                "message": "수강신청 기간 알려줘",
                "language": "한국어",
                "session_id": "session_1700000000000_abc123xyz",
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "answer": "2월 10일부터입니다." })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let answer = client_for(&server).post(question()).await.unwrap();
        assert_eq!(answer, "2월 10일부터입니다.");
    }

    #[tokio::test]
    async fn not_found_maps_to_endpoint_not_found() {
        let error = respond_with(404).await;
        assert_eq!(error.kind(), TransportErrorKind::EndpointNotFound);
        assert!(error.user_message().contains("서버를 찾을 수 없습니다"));
    }

    #[tokio::test]
    async fn internal_error_maps_to_server_internal_error() {
        let error = respond_with(500).await;
        assert_eq!(error.kind(), TransportErrorKind::ServerInternalError);
    }

    #[tokio::test]
    async fn unavailable_maps_to_server_unavailable() {
        let error = respond_with(503).await;
        assert_eq!(error.kind(), TransportErrorKind::ServerUnavailable);
    }

    #[tokio::test]
    async fn other_statuses_carry_code_and_reason() {
        let error = respond_with(502).await;
        assert_eq!(error.kind(), TransportErrorKind::ServerError);
        assert_eq!(error.user_message(), "서버 오류 (502): Bad Gateway");
    }

    #[tokio::test]
    async fn error_payload_on_success_status_is_application_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "error": "message 파라미터가 필요합니다." })),
            )
            .mount(&server)
            .await;

        let error = client_for(&server).post(question()).await.unwrap_err();
        assert_eq!(error.kind(), TransportErrorKind::ApplicationError);
        assert_eq!(error.user_message(), "message 파라미터가 필요합니다.");
    }

    #[tokio::test]
    async fn shapeless_payload_is_unexpected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let error = client_for(&server).post(question()).await.unwrap_err();
        assert_eq!(error.kind(), TransportErrorKind::UnexpectedResponseShape);
    }

    #[tokio::test]
    async fn refused_connection_is_server_unreachable() {
        // Grab a free port, then release it so nothing is listening there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client =
            HttpChatClient::new(ClientConfig::new(format!("http://127.0.0.1:{port}/api/chat/")))
                .unwrap();
        let error = client.post(question()).await.unwrap_err();

        assert_eq!(error.kind(), TransportErrorKind::ServerUnreachable);
        assert!(error.user_message().contains("서버에 연결할 수 없습니다"));
    }

    #[tokio::test]
    async fn slow_server_times_out_as_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "answer": "late" }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let config = ClientConfig::new(format!("{}/api/chat/", server.uri()))
            .with_request_timeout(Duration::from_millis(100));
        let error = HttpChatClient::new(config)
            .unwrap()
            .post(question())
            .await
            .unwrap_err();

        assert_eq!(error.kind(), TransportErrorKind::ServerUnreachable);
    }

    #[test]
    fn blank_endpoint_is_rejected() {
        let result = HttpChatClient::new(ClientConfig::new("   "));
        assert!(matches!(
            result.map(|_| ()).unwrap_err().kind(),
            TransportErrorKind::Configuration
        ));
    }
}
