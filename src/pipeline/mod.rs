//! Request handler core: validate, assemble, retrieve, dispatch, record.

mod request;
mod stream_tap;

pub use request::{ChatRequest, ChatRequestBody};

use crate::cache::{ResponseCache, cache_fingerprint};
use crate::config::Config;
use crate::context::{ContextAssembler, append_reference_material};
use crate::error::PipelineError;
use crate::providers::{DispatchOutcome, ProviderDispatcher, ProviderStream};
use crate::retrieval::{OpenAiEmbedding, RetrievalAugmenter};
use crate::store::{ExchangeRecord, SqliteTutorStore};
use crate::telemetry::TelemetrySink;
use crate::utils::text::truncate_with_ellipsis;
use std::sync::Arc;
use std::time::Duration;

/// Buffered result of one chat call. Also the cached value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedReply {
    pub text: String,
    pub tokens_consumed: u32,
    pub provider_model: String,
    pub retrieval_used: bool,
}

pub enum ChatReply {
    Buffered(BufferedReply),
    /// Raw provider output for the caller to forward as-is.
    Stream(ProviderStream),
}

impl std::fmt::Debug for ChatReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffered(reply) => f.debug_tuple("Buffered").field(reply).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

pub struct ChatPipeline {
    assembler: ContextAssembler,
    retrieval: Option<RetrievalAugmenter>,
    dispatcher: ProviderDispatcher,
    cache: Arc<ResponseCache<BufferedReply>>,
    telemetry: TelemetrySink,
}

impl ChatPipeline {
    pub fn new(
        assembler: ContextAssembler,
        retrieval: Option<RetrievalAugmenter>,
        dispatcher: ProviderDispatcher,
        cache: Arc<ResponseCache<BufferedReply>>,
        telemetry: TelemetrySink,
    ) -> Self {
        Self {
            assembler,
            retrieval,
            dispatcher,
            cache,
            telemetry,
        }
    }

    /// Wire every stage against one SQLite store.
    pub fn from_config(config: &Config, store: Arc<SqliteTutorStore>) -> Self {
        let embedder = OpenAiEmbedding::new(
            &config.retrieval.embedding_base_url,
            config.providers.openai_api_key.as_deref(),
            &config.retrieval.embedding_model,
            Duration::from_secs(config.retrieval.embedding_timeout_secs),
        );
        let retrieval =
            RetrievalAugmenter::new(Arc::new(embedder), store.clone(), &config.retrieval);

        Self::new(
            ContextAssembler::new(store.clone(), config.tutoring.clone()),
            Some(retrieval),
            ProviderDispatcher::from_config(
                &config.providers,
                config.tutoring.max_history_exchanges,
            ),
            Arc::new(ResponseCache::new(Duration::from_secs(config.cache.ttl_secs))),
            TelemetrySink::new(store),
        )
    }

    pub fn cache(&self) -> &Arc<ResponseCache<BufferedReply>> {
        &self.cache
    }

    pub async fn handle(&self, request: &ChatRequest) -> Result<ChatReply, PipelineError> {
        tracing::debug!(
            requester_id = %request.requester_id,
            activity_id = request.activity_id.as_deref().unwrap_or("-"),
            use_retrieval = request.use_retrieval,
            stream = request.stream,
            preview = %truncate_with_ellipsis(&request.message, 50),
            "Chat request"
        );

        let context = self
            .assembler
            .assemble(
                &request.requester_id,
                request.activity_id.as_deref(),
                &request.message,
            )
            .await?;
        let settings = context.settings;
        let activity_id = request.activity_id.clone();

        let streaming = ProviderDispatcher::will_stream(&settings, request.stream);
        let cache_key = (!streaming).then(|| {
            cache_fingerprint(
                &request.requester_id,
                activity_id.as_deref(),
                &request.message,
                &settings.digest(),
                request.use_retrieval,
            )
        });

        if let Some(key) = &cache_key
            && let Some(hit) = self.cache.get(key)
        {
            tracing::debug!(model = %hit.provider_model, "Response cache hit");
            self.telemetry.record_exchange(exchange_record(
                request,
                activity_id,
                &hit.text,
                hit.tokens_consumed,
                &hit.provider_model,
            ));
            return Ok(ChatReply::Buffered(hit));
        }

        let mut prompt = context.prompt;
        let mut retrieval_used = false;
        if request.use_retrieval {
            match &self.retrieval {
                Some(retrieval) => {
                    let passages = retrieval.retrieve(&request.message).await;
                    if !passages.is_empty() {
                        prompt.system_prompt =
                            append_reference_material(&prompt.system_prompt, &passages);
                        retrieval_used = true;
                    }
                }
                None => tracing::debug!("Retrieval requested but no index is configured"),
            }
        }

        let outcome = match self
            .dispatcher
            .dispatch(&prompt, &settings, request.stream)
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(
                    provider = settings.family.name(),
                    model = %settings.model,
                    status = ?error.status(),
                    %error,
                    "Provider call failed"
                );
                self.telemetry
                    .record_activity(&request.requester_id, &request.message);
                return Err(error.into());
            }
        };

        match outcome {
            DispatchOutcome::Buffered(response) => {
                let reply = BufferedReply {
                    text: response.text,
                    tokens_consumed: response.tokens_consumed,
                    provider_model: response.provider_model,
                    retrieval_used,
                };
                if let Some(key) = cache_key {
                    self.cache.put(key, reply.clone());
                }
                self.telemetry.record_exchange(exchange_record(
                    request,
                    activity_id,
                    &reply.text,
                    reply.tokens_consumed,
                    &reply.provider_model,
                ));
                Ok(ChatReply::Buffered(reply))
            }
            DispatchOutcome::Stream(upstream) => {
                let record = exchange_record(request, activity_id, "", 0, &settings.model);
                Ok(ChatReply::Stream(stream_tap::tap_stream(
                    upstream,
                    self.telemetry.clone(),
                    record,
                )))
            }
        }
    }
}

fn exchange_record(
    request: &ChatRequest,
    activity_id: Option<String>,
    response: &str,
    tokens_used: u32,
    model: &str,
) -> ExchangeRecord {
    ExchangeRecord {
        requester_id: request.requester_id.clone(),
        activity_id,
        message: request.message.clone(),
        response: response.to_string(),
        tokens_used,
        model: model.to_string(),
    }
}
