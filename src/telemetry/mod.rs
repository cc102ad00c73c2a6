//! Cost and attempt telemetry.
//!
//! After every request, success or failure, the orchestrator emits the
//! attempt log and total estimated cost to a [`TelemetrySink`]. Billing
//! for failed attempts is deliberate: the tokens were spent either way.
//! Persistence of these reports is a collaborator concern; the default
//! sink just logs through `tracing`.

use crate::orchestrator::RequestReport;

/// Receiver for per-request diagnostics
pub trait TelemetrySink: Send + Sync {
    fn record(&self, report: &RequestReport);
}

/// Default sink: structured log lines via `tracing`
#[derive(Debug, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record(&self, report: &RequestReport) {
        tracing::info!(
            "[Telemetry] request {} ({}) finished in {}ms: {} attempts, ${:.6} estimated",
            report.request_id,
            report.task.as_str(),
            report.elapsed_ms,
            report.attempts.len(),
            report.total_cost_usd,
        );
        for (i, attempt) in report.attempts.iter().enumerate() {
            tracing::debug!(
                "[Telemetry]   attempt {}: {} -> {} ({}ms, ${:.6})",
                i,
                attempt.model,
                attempt.outcome.label(),
                attempt.elapsed_ms,
                attempt.estimated_cost_usd,
            );
        }
    }
}

/// Sink that drops everything. Useful in tests and embedded use.
#[derive(Debug, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record(&self, _report: &RequestReport) {}
}

/// Install the process-wide tracing subscriber, filtered by `RUST_LOG`.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
