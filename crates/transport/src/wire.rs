use serde::{Deserialize, Serialize};

use crate::error::{ApplicationSnafu, TransportResult, UnexpectedResponseShapeSnafu};

/// JSON body posted to the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub language: String,
    pub session_id: String,
}

impl ChatRequest {
    pub fn new(
        message: impl Into<String>,
        session_id: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            language: language.into(),
            session_id: session_id.into(),
        }
    }
}

/// Body of a 2xx reply. The server sends either `answer` or `error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatResponse {
    /// Parses a raw 2xx body and extracts the answer text.
    pub fn parse_answer(body: &str) -> TransportResult<String> {
        let response = serde_json::from_str::<ChatResponse>(body).map_err(|source| {
            UnexpectedResponseShapeSnafu {
                stage: "decode-chat-response",
                details: source.to_string(),
            }
            .build()
        })?;

        response.into_answer()
    }

    /// Empty strings count as missing fields.
    pub fn into_answer(self) -> TransportResult<String> {
        if let Some(answer) = self.answer.filter(|answer| !answer.is_empty()) {
            return Ok(answer);
        }

        if let Some(message) = self.error.filter(|message| !message.is_empty()) {
            return ApplicationSnafu {
                stage: "read-chat-response",
                message,
            }
            .fail();
        }

        UnexpectedResponseShapeSnafu {
            stage: "read-chat-response",
            details: "response carries neither `answer` nor `error`".to_string(),
        }
        .fail()
    }
}
