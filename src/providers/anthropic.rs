use super::anthropic_types::{ChatRequest, ChatResponse, Message, ResponseContentBlock};
use super::{ProviderResponse, api_error};
use crate::context::{PromptContext, ProviderSettings};
use crate::error::ProviderError;
use crate::store::ConversationTurn;
use reqwest::Client;

const PROVIDER: &str = "Anthropic";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic messages client. The system prompt travels as a top-level field
/// and the message list carries only user/assistant turns.
pub struct AnthropicClient {
    cached_api_key: Option<String>,
    cached_messages_url: String,
    client: Client,
}

impl AnthropicClient {
    pub fn new(api_key: Option<&str>, base_url: &str, client: Client) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            cached_api_key: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
            cached_messages_url: format!("{base}/v1/messages"),
            client,
        }
    }

    pub(super) fn build_request(
        prompt: &PromptContext,
        history: &[ConversationTurn],
        settings: &ProviderSettings,
    ) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() * 2 + 1);
        for turn in history {
            messages.push(Message {
                role: "user",
                content: turn.user_text.clone(),
            });
            messages.push(Message {
                role: "assistant",
                content: turn.assistant_text.clone(),
            });
        }
        messages.push(Message {
            role: "user",
            content: prompt.user_message.clone(),
        });

        ChatRequest {
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            system: Some(prompt.system_prompt.clone()).filter(|s| !s.is_empty()),
            messages,
            temperature: settings.temperature,
        }
    }

    pub(super) async fn complete(
        &self,
        request: &ChatRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        let api_key = self
            .cached_api_key
            .as_ref()
            .ok_or(ProviderError::MissingCredentials { provider: PROVIDER })?;

        let response = self
            .client
            .post(&self.cached_messages_url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, &e))?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER, response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, &e))?;
        parse_response(&body).map(|parsed| parsed.with_model(&request.model))
    }
}

fn parse_response(body: &str) -> Result<ProviderResponse, ProviderError> {
    let malformed = |message: String| ProviderError::Malformed {
        provider: PROVIDER,
        message,
    };
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| malformed(format!("invalid JSON: {e}")))?;

    let text = parsed
        .content
        .into_iter()
        .filter_map(|block| match block {
            ResponseContentBlock::Text { text } => Some(text),
            ResponseContentBlock::Unsupported => None,
        })
        .collect::<Vec<_>>()
        .join("");
    if text.is_empty() {
        return Err(malformed("no text content blocks".into()));
    }

    let tokens = parsed
        .usage
        .map_or(0, |usage| usage.input_tokens + usage.output_tokens);
    Ok(ProviderResponse::with_usage(text, tokens))
}
