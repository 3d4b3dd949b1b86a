//! Best-effort side-channel persistence after a chat exchange.
//!
//! Every channel runs as its own task. Failures are logged at error level
//! and never reach the caller.

use crate::error::TelemetrySinkError;
use crate::store::{ExchangeRecord, TutorStore};
use crate::utils::text::truncate_chars;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Questions are bucketed by their first 100 characters.
pub const QUESTION_KEY_CHARS: usize = 100;

#[derive(Clone)]
pub struct TelemetrySink {
    store: Arc<dyn TutorStore>,
}

/// Handles for the spawned writes. Dropping it detaches the tasks.
#[derive(Debug, Default)]
pub struct TelemetryHandles(Vec<JoinHandle<()>>);

impl TelemetryHandles {
    /// Wait for every channel to finish.
    pub async fn join(self) {
        for handle in self.0 {
            let _ = handle.await;
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TelemetrySink {
    pub fn new(store: Arc<dyn TutorStore>) -> Self {
        Self { store }
    }

    /// Log the exchange, bump the question counter, and mark the requester
    /// active.
    pub fn record_exchange(&self, record: ExchangeRecord) -> TelemetryHandles {
        let requester_id = record.requester_id.clone();
        let question = record.message.clone();
        let store = Arc::clone(&self.store);
        let log = spawn_channel("conversation_log", async move {
            store.append_exchange(&record).await
        });

        let mut handles = self.record_activity(&requester_id, &question);
        handles.0.insert(0, log);
        handles
    }

    /// Counter and liveness only. Used when no response was produced.
    pub fn record_activity(&self, requester_id: &str, question: &str) -> TelemetryHandles {
        let store = Arc::clone(&self.store);
        let id = requester_id.to_string();
        let key = question_key(question);
        let frequency = spawn_channel("question_frequency", async move {
            store.increment_question_frequency(&id, &key).await
        });

        let store = Arc::clone(&self.store);
        let id = requester_id.to_string();
        let liveness = spawn_channel("liveness", async move { store.touch_liveness(&id).await });

        TelemetryHandles(vec![frequency, liveness])
    }
}

fn question_key(question: &str) -> String {
    truncate_chars(question.trim(), QUESTION_KEY_CHARS).to_string()
}

fn spawn_channel<F>(channel: &'static str, write: F) -> JoinHandle<()>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(error) = write.await {
            let error = TelemetrySinkError {
                channel,
                message: format!("{error:#}"),
            };
            tracing::error!(%error, "Telemetry write failed");
        }
    })
}
