use super::AppState;
use crate::error::{PipelineError, ValidationIssue};
use crate::pipeline::{BufferedReply, ChatReply, ChatRequest, ChatRequestBody};
use crate::providers::ProviderStream;
use axum::{
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{Response, StatusCode, header},
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatSuccessBody<'a> {
    response: &'a str,
    tokens_used: u32,
    model: &'a str,
    rag_used: bool,
}

impl<'a> From<&'a BufferedReply> for ChatSuccessBody<'a> {
    fn from(reply: &'a BufferedReply) -> Self {
        Self {
            response: &reply.text,
            tokens_used: reply.tokens_consumed,
            model: &reply.provider_model,
            rag_used: reply.retrieval_used,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

fn error_response(error: &PipelineError) -> axum::response::Response {
    let body = ErrorBody {
        error: error.user_message(),
        details: error.details(),
    };
    (error.status_code(), Json(body)).into_response()
}

fn sse_passthrough(stream: ProviderStream) -> Response<Body> {
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-cache"),
    );
    headers.insert(
        header::CONNECTION,
        header::HeaderValue::from_static("keep-alive"),
    );
    response
}

/// GET /health
pub(super) async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "cacheEntries": state.pipeline.cache().len(),
    }))
}

/// POST /chat
pub(super) async fn handle_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequestBody>, JsonRejection>,
) -> axum::response::Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "Rejected chat body");
            return error_response(&PipelineError::Validation(ValidationIssue::InvalidJson));
        }
    };

    let request = match ChatRequest::try_from(body) {
        Ok(request) => request,
        Err(issue) => return error_response(&PipelineError::Validation(issue)),
    };

    let request_id = Uuid::new_v4();
    let outcome = state
        .pipeline
        .handle(&request)
        .instrument(tracing::info_span!("chat", %request_id))
        .await;

    match outcome {
        Ok(ChatReply::Buffered(reply)) => Json(ChatSuccessBody::from(&reply)).into_response(),
        Ok(ChatReply::Stream(stream)) => sse_passthrough(stream).into_response(),
        Err(error) => {
            if matches!(error, PipelineError::Store(_) | PipelineError::Config(_)) {
                tracing::error!(%request_id, %error, "Chat request failed");
            }
            error_response(&error)
        }
    }
}
