use crate::OperationRecord;
use propagation_probe_report_model::PollAttempt;
use std::future::Future;
use std::time::Duration;

pub use propagation_probe_report_model::immediately_consistent;

/// The delay intervals used across scenarios unless overridden on the command line.
pub const DEFAULT_POLL_DELAYS_MS: [u64; 5] = [50, 100, 500, 1000, 2000];

/// Checks how quickly a just-created resource becomes visible to a backend.
///
/// For each configured delay the probe suspends for that duration, issues exactly one query and
/// records whether the resource was found along with the query's measurement. Polling is strictly
/// sequential: the delays model "time since creation", so overlapping queries would invalidate
/// their meaning.
pub struct ConsistencyProbe {
    delays: Vec<Duration>,
}

impl Default for ConsistencyProbe {
    fn default() -> Self {
        Self::new(&DEFAULT_POLL_DELAYS_MS)
    }
}

impl ConsistencyProbe {
    pub fn new(delays_ms: &[u64]) -> Self {
        let mut delays_ms = delays_ms.to_vec();
        delays_ms.sort_unstable();
        Self {
            delays: delays_ms.into_iter().map(Duration::from_millis).collect(),
        }
    }

    pub fn delays_ms(&self) -> Vec<u64> {
        self.delays.iter().map(|d| d.as_millis() as u64).collect()
    }

    /// Poll for `resource_id` once per configured delay, in ascending delay order.
    ///
    /// The query returns whether the resource was visible; a query error is recorded as a failed
    /// measurement with `found = false` and polling continues, so one flaky request cannot end
    /// the probe early.
    pub async fn poll<F, Fut>(
        &self,
        operation_id: &str,
        resource_id: &str,
        mut query: F,
    ) -> Vec<PollAttempt>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = anyhow::Result<bool>>,
    {
        let mut attempts = Vec::with_capacity(self.delays.len());

        for delay in &self.delays {
            tokio::time::sleep(*delay).await;

            let record = OperationRecord::new(operation_id);
            let outcome = query(resource_id.to_string()).await;
            let found = matches!(outcome, Ok(true));
            if !found {
                log::debug!(
                    "Resource {resource_id} not visible after {}ms",
                    delay.as_millis()
                );
            }

            attempts.push(PollAttempt {
                delay_ms: delay.as_millis() as u64,
                found,
                measurement: record.finalize(&outcome),
            });
        }

        attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn one_attempt_per_configured_delay_in_ascending_order() {
        let probe = ConsistencyProbe::new(&[100, 50, 500]);
        let attempts = probe
            .poll("poll_branch", "probe-branch", |_| async { Ok(true) })
            .await;

        assert_eq!(3, attempts.len());
        assert_eq!(
            vec![50, 100, 500],
            attempts.iter().map(|a| a.delay_ms).collect::<Vec<_>>()
        );
        assert!(attempts.windows(2).all(|w| w[0].delay_ms <= w[1].delay_ms));
    }

    #[tokio::test]
    async fn backend_visible_from_the_second_delay_counts_as_consistent() {
        // Mimics a backend that needs ~100ms before a created resource is readable, so the
        // query at the 50ms delay misses and every later one hits.
        let probe = ConsistencyProbe::new(&[50, 100, 500]);
        let mut queries = 0;
        let attempts = probe
            .poll("poll_branch", "probe-branch", move |_| {
                queries += 1;
                let visible = queries > 1;
                async move { Ok(visible) }
            })
            .await;

        assert!(!attempts[0].found);
        assert!(attempts[0].measurement.succeeded);
        assert!(attempts[1].found);
        assert!(attempts[2].found);
        assert!(immediately_consistent(&attempts));
    }

    #[tokio::test]
    async fn query_errors_are_recorded_and_polling_continues() {
        let probe = ConsistencyProbe::new(&[10, 20]);
        let mut first = true;
        let attempts = probe
            .poll("poll_commit", "abc123", move |_| {
                let fail = first;
                first = false;
                async move {
                    if fail {
                        anyhow::bail!("backend unreachable")
                    } else {
                        Ok(true)
                    }
                }
            })
            .await;

        assert_eq!(2, attempts.len());
        assert!(!attempts[0].found);
        assert!(!attempts[0].measurement.succeeded);
        assert_eq!(
            Some("backend unreachable".to_string()),
            attempts[0].measurement.error
        );
        assert!(attempts[1].found);
        assert!(immediately_consistent(&attempts));
    }

    #[tokio::test]
    async fn queries_are_sequential_not_parallel() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let in_flight = Arc::new(AtomicUsize::new(0));
        let probe = ConsistencyProbe::new(&[10, 10, 10]);
        let attempts = probe
            .poll("poll_branch", "probe-branch", {
                let in_flight = in_flight.clone();
                move |_| {
                    let in_flight = in_flight.clone();
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst);
                        assert_eq!(0, now, "queries must not overlap");
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(true)
                    }
                }
            })
            .await;

        assert_eq!(3, attempts.len());
    }
}
