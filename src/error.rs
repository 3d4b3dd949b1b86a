use axum::http::StatusCode;
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Errors that can terminate a chat request.
///
/// Only validation, missing requester, and provider failures are expected to
/// reach the caller in normal operation. Retrieval and telemetry failures have
/// their own types but are absorbed at their stage boundary and never show up
/// here.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Request validation ──────────────────────────────────────────────
    #[error("validation failed: {0}")]
    Validation(ValidationIssue),

    // ── Requester resolution ────────────────────────────────────────────
    #[error("requester not found: {0}")]
    NotFound(String),

    // ── LLM / Provider ──────────────────────────────────────────────────
    #[error("provider: {0}")]
    Provider(#[from] ProviderError),

    // ── Settings / Config ───────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Data access ─────────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(String),
}

impl PipelineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Provider(_) | Self::Config(_) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Generic, localized text safe to show to a student.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(issue) => issue.user_message(),
            Self::NotFound(_) => t!("errors.requester_not_found").into_owned(),
            Self::Provider(_) | Self::Config(_) => {
                t!("errors.assistant_unavailable").into_owned()
            }
            Self::Store(_) => t!("errors.internal").into_owned(),
        }
    }

    /// Diagnostic detail for the optional `details` field. Upstream bodies are
    /// already scrubbed and truncated by the time they land here.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Validation(_) | Self::NotFound(_) | Self::Store(_) => None,
            Self::Provider(error) => Some(error.to_string()),
            Self::Config(error) => Some(error.to_string()),
        }
    }
}

// ─── Validation errors ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("request body is not valid JSON")]
    InvalidJson,

    #[error("message is empty")]
    EmptyMessage,

    #[error("studentId is missing")]
    MissingRequester,
}

impl ValidationIssue {
    fn user_message(self) -> String {
        match self {
            Self::InvalidJson => t!("errors.invalid_json").into_owned(),
            Self::EmptyMessage => t!("errors.empty_message").into_owned(),
            Self::MissingRequester => t!("errors.missing_requester").into_owned(),
        }
    }
}

// ─── Provider errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} API error ({status}): {body}")]
    Upstream {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} request timed out")]
    Timeout { provider: &'static str },

    #[error("{provider} request failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} returned a malformed response: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} credentials not set")]
    MissingCredentials { provider: &'static str },
}

impl ProviderError {
    /// Upstream HTTP status, when the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn from_reqwest(provider: &'static str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout { provider }
        } else {
            Self::Transport {
                provider,
                message: crate::providers::sanitize_api_error(&error.to_string()),
            }
        }
    }
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unrecognized provider model `{0}`")]
    UnknownModel(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Retrieval errors ────────────────────────────────────────────────────────

/// Always recovered locally by the retrieval stage.
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("similarity search failed: {0}")]
    Search(String),

    #[error("{stage} timed out")]
    Timeout { stage: &'static str },
}

// ─── Telemetry errors ────────────────────────────────────────────────────────

/// Always recovered locally by the telemetry sink.
#[derive(Debug, Error)]
#[error("telemetry channel {channel} failed: {message}")]
pub struct TelemetrySinkError {
    pub channel: &'static str,
    pub message: String,
}
