use crate::providers::{ProviderStream, StreamTally};
use crate::store::ExchangeRecord;
use crate::telemetry::TelemetrySink;
use futures_util::StreamExt;

/// Records counter and liveness for a stream that never finished cleanly,
/// whether the upstream failed or the client went away.
struct UnfinishedGuard {
    telemetry: TelemetrySink,
    requester_id: String,
    question: String,
    armed: bool,
}

impl UnfinishedGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for UnfinishedGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if tokio::runtime::Handle::try_current().is_err() {
            tracing::warn!("Stream dropped outside a runtime; activity not recorded");
            return;
        }
        tracing::debug!(requester_id = %self.requester_id, "Stream ended before completion");
        self.telemetry
            .record_activity(&self.requester_id, &self.question);
    }
}

/// Forward provider bytes unchanged while tallying text and usage. The
/// conversation row is written only once the upstream has finished cleanly;
/// a failed or dropped stream still records counter and liveness.
pub(super) fn tap_stream(
    upstream: ProviderStream,
    telemetry: TelemetrySink,
    mut record: ExchangeRecord,
) -> ProviderStream {
    let mut guard = UnfinishedGuard {
        telemetry: telemetry.clone(),
        requester_id: record.requester_id.clone(),
        question: record.message.clone(),
        armed: true,
    };

    Box::pin(async_stream::stream! {
        let mut upstream = upstream;
        let mut tally = StreamTally::new();
        let mut failed = false;

        while let Some(item) = upstream.next().await {
            match item {
                Ok(bytes) => {
                    tally.observe(&bytes);
                    yield Ok(bytes);
                }
                Err(error) => {
                    tracing::error!(%error, "Provider stream failed mid-response");
                    failed = true;
                    yield Err(error);
                    break;
                }
            }
        }

        if !failed {
            guard.disarm();
            let response = tally.finish(&record.model);
            tracing::debug!(
                tokens = response.tokens_consumed,
                chars = response.text.chars().count(),
                "Provider stream finished"
            );
            record.response = response.text;
            record.tokens_used = response.tokens_consumed;
            telemetry.record_exchange(record);
        }
    })
}
