use super::openai_types::{
    ChatCompletionChunk, ChatRequest, ChatResponse, Message, StreamOptions,
};
use super::sse::{SseBuffer, parse_data_lines_without_done};
use super::{ProviderResponse, ProviderStream, api_error};
use crate::context::{PromptContext, ProviderSettings};
use crate::error::ProviderError;
use crate::store::ConversationTurn;
use futures_util::StreamExt;
use reqwest::Client;

const PROVIDER: &str = "OpenAI";

/// OpenAI chat-completions client: one flat message list with the system
/// prompt inline as the first entry.
pub struct OpenAiClient {
    /// Pre-computed `"Bearer <key>"` header value.
    cached_auth_header: Option<String>,
    cached_completions_url: String,
    client: Client,
}

impl OpenAiClient {
    pub fn new(api_key: Option<&str>, base_url: &str, client: Client) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            cached_auth_header: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(|k| format!("Bearer {k}")),
            cached_completions_url: format!("{base}/v1/chat/completions"),
            client,
        }
    }

    pub(super) fn build_request(
        prompt: &PromptContext,
        history: &[ConversationTurn],
        settings: &ProviderSettings,
        stream: bool,
    ) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(Message {
            role: "system",
            content: prompt.system_prompt.clone(),
        });
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
            messages,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            stream: stream.then_some(true),
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response, ProviderError> {
        let auth_header = self
            .cached_auth_header
            .as_ref()
            .ok_or(ProviderError::MissingCredentials { provider: PROVIDER })?;

        let response = self
            .client
            .post(&self.cached_completions_url)
            .header("Authorization", auth_header)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, &e))?;

        if !response.status().is_success() {
            return Err(api_error(PROVIDER, response).await);
        }
        Ok(response)
    }

    pub(super) async fn complete(
        &self,
        request: &ChatRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        let response = self.send(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, &e))?;
        parse_response(&body).map(|parsed| parsed.with_model(&request.model))
    }

    pub(super) async fn open_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<ProviderStream, ProviderError> {
        let response = self.send(request).await?;
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ProviderError::from_reqwest(PROVIDER, &e)));
        Ok(Box::pin(stream))
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
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| malformed("no content in choices".into()))?;

    let tokens = parsed.usage.map_or(0, |usage| usage.total());
    Ok(ProviderResponse::with_usage(text, tokens))
}

/// Reads a streamed completion as it passes through, collecting the text
/// deltas and the final usage block.
#[derive(Debug, Default)]
pub struct StreamTally {
    buffer: SseBuffer,
    text: String,
    tokens: u64,
}

impl StreamTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, chunk: &[u8]) {
        self.buffer.push_chunk(chunk);
        while let Some(block) = self.buffer.next_event_block() {
            self.consume_block(&block);
        }
    }

    fn consume_block(&mut self, block: &str) {
        for data in parse_data_lines_without_done(block) {
            let Ok(chunk) = serde_json::from_str::<ChatCompletionChunk>(data) else {
                continue;
            };
            for choice in &chunk.choices {
                if let Some(content) = &choice.delta.content {
                    self.text.push_str(content);
                }
            }
            if let Some(usage) = chunk.usage {
                self.tokens = usage.total();
            }
        }
    }

    /// Flush any trailing frame and return the assembled response.
    pub fn finish(mut self, model: &str) -> ProviderResponse {
        let remainder = self.buffer.take_remainder();
        if !remainder.trim().is_empty() {
            self.consume_block(&remainder);
        }
        ProviderResponse::with_usage(self.text, self.tokens).with_model(model)
    }
}
