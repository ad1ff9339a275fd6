mod probe;
mod report;

use chrono::{DateTime, Utc};
use propagation_probe_report_model::Measurement;
use std::fmt::Display;
use std::future::Future;

pub use probe::{ConsistencyProbe, DEFAULT_POLL_DELAYS_MS};
pub use report::{JsonFileReporter, ReportCollector, ReportConfig, Reporter, SummaryReporter};

/// Times a single backend operation.
///
/// Created immediately before the operation is invoked and finalized when it settles. The
/// duration comes from a monotonic [std::time::Instant], so adjustments to the system clock
/// during the run cannot skew it; the wall-clock stamp is carried separately for the report.
pub struct OperationRecord {
    operation_id: String,
    started_at: DateTime<Utc>,
    started: std::time::Instant,
}

impl OperationRecord {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            started_at: Utc::now(),
            started: std::time::Instant::now(),
        }
    }

    /// Finalize this record against the settled outcome of the operation.
    ///
    /// A failed operation still produces a complete measurement carrying the error text. The
    /// error itself is not consumed; the caller decides whether it aborts anything.
    pub fn finalize<T, E: Display>(self, outcome: &Result<T, E>) -> Measurement {
        let duration_ms = self.started.elapsed().as_millis() as u64;
        match outcome {
            Ok(_) => Measurement::success(self.operation_id, self.started_at, duration_ms),
            Err(e) => {
                Measurement::failure(self.operation_id, self.started_at, duration_ms, e.to_string())
            }
        }
    }
}

/// Execute `action` exactly once and return its settled result together with the measurement.
///
/// This never propagates the action's failure by itself; callers inspect the returned result
/// and decide whether a failed measurement aborts their step.
pub async fn measure<T, E, Fut>(
    operation_id: &str,
    action: impl FnOnce() -> Fut,
) -> (Measurement, Result<T, E>)
where
    E: Display,
    Fut: Future<Output = Result<T, E>>,
{
    let record = OperationRecord::new(operation_id);
    let outcome = action().await;
    (record.finalize(&outcome), outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn measure_runs_the_action_exactly_once() {
        let mut calls = 0;
        let (measurement, outcome) = measure("count_calls", || {
            calls += 1;
            async { Ok::<_, anyhow::Error>(42) }
        })
        .await;

        assert_eq!(1, calls);
        assert_eq!(42, outcome.unwrap());
        assert!(measurement.succeeded);
        assert_eq!("count_calls", measurement.operation);
        assert!(measurement.error.is_none());
    }

    #[tokio::test]
    async fn failed_action_still_yields_a_complete_measurement() {
        let (measurement, outcome) = measure("always_fails", || async {
            Err::<(), _>(anyhow::anyhow!("connection refused"))
        })
        .await;

        assert!(outcome.is_err());
        assert!(!measurement.succeeded);
        assert_eq!(Some("connection refused".to_string()), measurement.error);
    }

    #[tokio::test]
    async fn duration_covers_the_await() {
        let (measurement, _) = measure("slow_op", || async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok::<_, anyhow::Error>(())
        })
        .await;

        assert!(measurement.duration_ms >= 20);
    }
}
