pub mod anthropic;
mod anthropic_types;
pub mod family;
pub mod http_client;
pub mod openai;
mod openai_types;
pub mod scrub;
pub mod sse;

pub use anthropic::AnthropicClient;
pub use family::ProviderFamily;
pub use openai::{OpenAiClient, StreamTally};
pub use scrub::{api_error, sanitize_api_error, scrub_secret_patterns};

use crate::config::ProvidersConfig;
use crate::context::{PromptContext, ProviderSettings};
use crate::error::ProviderError;
use crate::store::ConversationTurn;
use bytes::Bytes;
use futures_util::Stream;
use std::pin::Pin;

/// Raw provider bytes, forwarded to the caller unmodified.
pub type ProviderStream = Pin<Box<dyn Stream<Item = Result<Bytes, ProviderError>> + Send>>;

/// A complete, buffered completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub text: String,
    pub tokens_consumed: u32,
    pub provider_model: String,
}

impl ProviderResponse {
    pub fn with_usage(text: String, tokens_consumed: u64) -> Self {
        Self {
            text,
            tokens_consumed: u32::try_from(tokens_consumed).unwrap_or(u32::MAX),
            provider_model: String::new(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.provider_model = model.into();
        self
    }
}

/// Exactly one of these is produced per dispatched call.
pub enum DispatchOutcome {
    Buffered(ProviderResponse),
    Stream(ProviderStream),
}

impl std::fmt::Debug for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffered(response) => f.debug_tuple("Buffered").field(response).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Single seam between an assembled prompt and the provider families.
pub struct ProviderDispatcher {
    openai: OpenAiClient,
    anthropic: AnthropicClient,
    max_history_exchanges: usize,
}

impl ProviderDispatcher {
    pub fn new(openai: OpenAiClient, anthropic: AnthropicClient, max_history_exchanges: usize) -> Self {
        Self {
            openai,
            anthropic,
            max_history_exchanges,
        }
    }

    pub fn from_config(config: &ProvidersConfig, max_history_exchanges: usize) -> Self {
        let client = http_client::build_provider_client_with_timeout(config.timeout_secs);
        Self::new(
            OpenAiClient::new(
                config.openai_api_key.as_deref(),
                &config.openai_base_url,
                client.clone(),
            ),
            AnthropicClient::new(
                config.anthropic_api_key.as_deref(),
                &config.anthropic_base_url,
                client,
            ),
            max_history_exchanges,
        )
    }

    /// Whether a call with these settings will actually stream.
    pub fn will_stream(settings: &ProviderSettings, requested: bool) -> bool {
        requested && settings.family.supports_streaming()
    }

    pub async fn dispatch(
        &self,
        prompt: &PromptContext,
        settings: &ProviderSettings,
        stream: bool,
    ) -> Result<DispatchOutcome, ProviderError> {
        let history = trim_history(&prompt.history, self.max_history_exchanges);
        let streaming = Self::will_stream(settings, stream);
        if stream && !streaming {
            tracing::debug!(
                provider = settings.family.name(),
                model = %settings.model,
                "Streaming unsupported; serving buffered response"
            );
        }

        match settings.family {
            ProviderFamily::OpenAi => {
                let request = OpenAiClient::build_request(prompt, history, settings, streaming);
                if streaming {
                    self.openai
                        .open_stream(&request)
                        .await
                        .map(DispatchOutcome::Stream)
                } else {
                    self.openai
                        .complete(&request)
                        .await
                        .map(DispatchOutcome::Buffered)
                }
            }
            ProviderFamily::Anthropic => {
                let request = AnthropicClient::build_request(prompt, history, settings);
                self.anthropic
                    .complete(&request)
                    .await
                    .map(DispatchOutcome::Buffered)
            }
        }
    }
}

/// The most recent `max_exchanges` turns.
fn trim_history(history: &[ConversationTurn], max_exchanges: usize) -> &[ConversationTurn] {
    &history[history.len().saturating_sub(max_exchanges)..]
}
