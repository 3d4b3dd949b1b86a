use crate::error::ValidationIssue;
use serde::Deserialize;

/// Wire shape of `POST /chat`. Every field is optional here so that
/// validation can report what is missing instead of a generic decode error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub activity_id: Option<String>,
    #[serde(default)]
    pub use_rag: Option<bool>,
    #[serde(default)]
    pub stream: Option<bool>,
}

/// A validated chat call. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub requester_id: String,
    pub activity_id: Option<String>,
    pub use_retrieval: bool,
    pub stream: bool,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TryFrom<ChatRequestBody> for ChatRequest {
    type Error = ValidationIssue;

    fn try_from(body: ChatRequestBody) -> Result<Self, Self::Error> {
        let message = body
            .message
            .filter(|m| !m.trim().is_empty())
            .ok_or(ValidationIssue::EmptyMessage)?;
        let requester_id =
            non_blank(body.student_id).ok_or(ValidationIssue::MissingRequester)?;

        Ok(Self {
            message,
            requester_id,
            activity_id: non_blank(body.activity_id),
            use_retrieval: body.use_rag.unwrap_or(false),
            stream: body.stream.unwrap_or(false),
        })
    }
}
