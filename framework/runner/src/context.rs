use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use crate::executor::Executor;
use propagation_probe_core::prelude::ShutdownListener;
use propagation_probe_instruments::{measure, ConsistencyProbe, Reporter};
use propagation_probe_report_model::{Measurement, PollAttempt, ScenarioResult};

pub trait UserValuesConstraint: Default + Debug + Send + Sync + 'static {}

impl UserValuesConstraint for () {}

/// The context handed to every hook of a scenario.
///
/// Steps communicate exclusively through the typed user values: whatever a step stores with
/// [StepContext::get_mut] is the explicit input of the steps after it. Everything a step measures
/// is recorded here and drained into that step's [ScenarioResult] when the hook returns.
pub struct StepContext<V: UserValuesConstraint> {
    executor: Arc<Executor>,
    reporter: Arc<Reporter>,
    shutdown_listener: ShutdownListener,
    run_id: String,
    samples: usize,
    delays_ms: Vec<u64>,
    env: HashMap<String, String>,
    recorded_measurements: Vec<Measurement>,
    recorded_attempts: Vec<PollAttempt>,
    pending_result: Option<ScenarioResult>,
    in_teardown: bool,
    value: V,
}

impl<V: UserValuesConstraint> StepContext<V> {
    pub(crate) fn new(
        executor: Arc<Executor>,
        reporter: Arc<Reporter>,
        shutdown_listener: ShutdownListener,
        run_id: String,
        samples: usize,
        delays_ms: Vec<u64>,
    ) -> Self {
        Self {
            executor,
            reporter,
            shutdown_listener,
            run_id,
            samples,
            delays_ms,
            env: HashMap::new(),
            recorded_measurements: Vec::new(),
            recorded_attempts: Vec::new(),
            pending_result: None,
            in_teardown: false,
            value: Default::default(),
        }
    }

    /// From here on, async work runs to completion instead of racing the shutdown signal, so
    /// cleanup still happens on an interrupted run.
    pub(crate) fn begin_teardown(&mut self) {
        self.in_teardown = true;
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn reporter(&self) -> Arc<Reporter> {
        self.reporter.clone()
    }

    pub fn shutdown_listener(&mut self) -> &mut ShutdownListener {
        &mut self.shutdown_listener
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// The number of timed samples a read step should take.
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn delays_ms(&self) -> &[u64] {
        &self.delays_ms
    }

    /// A name for a transient resource that cannot collide with other runs.
    ///
    /// The suffix is the current wall-clock in milliseconds, so two runs against the same
    /// repository stay out of each other's way without any locking. Callers creating several
    /// resources in the same instant must use distinct prefixes.
    pub fn unique_name(&self, prefix: &str) -> String {
        format!("{prefix}-{}", chrono::Utc::now().timestamp_millis())
    }

    /// Record a non-secret configuration value for the report's environment descriptor.
    pub fn add_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.insert(key.into(), value.into());
    }

    pub fn get_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub fn get(&self) -> &V {
        &self.value
    }

    /// Run `fut` to settlement, record its measurement against this step, and return the value
    /// if it succeeded.
    ///
    /// A backend failure is folded into the measurement and surfaces as `Ok(None)`; the step
    /// decides whether that aborts anything. The returned error is reserved for cancellation by
    /// the shutdown signal.
    pub fn timed<T>(
        &mut self,
        operation_id: &str,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<Option<T>> {
        let work = async move { Ok(measure(operation_id, || fut).await) };
        let (measurement, outcome) = if self.in_teardown {
            self.executor.execute_to_completion(work)?
        } else {
            self.executor.execute_in_place(work)?
        };

        self.reporter.add_operation(&measurement);
        self.recorded_measurements.push(measurement);

        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                log::warn!("✘ {operation_id} failed: {e:#}");
                Ok(None)
            }
        }
    }

    /// Record a measurement produced outside [StepContext::timed], e.g. by a concurrent join.
    pub fn record_measurement(&mut self, measurement: Measurement) {
        self.reporter.add_operation(&measurement);
        self.recorded_measurements.push(measurement);
    }

    /// Poll for a just-created resource at the run's configured delays and record the attempts
    /// against this step. See [ConsistencyProbe::poll] for the semantics.
    pub fn poll_consistency<F, Fut>(
        &mut self,
        operation_id: &str,
        resource_id: &str,
        query: F,
    ) -> anyhow::Result<Vec<PollAttempt>>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = anyhow::Result<bool>>,
    {
        let probe = ConsistencyProbe::new(&self.delays_ms);
        let attempts = self
            .executor
            .execute_in_place(async move { Ok(probe.poll(operation_id, resource_id, query).await) })?;

        for attempt in &attempts {
            self.reporter.add_operation(&attempt.measurement);
        }
        self.recorded_attempts.extend(attempts.iter().cloned());
        Ok(attempts)
    }

    /// The measurements recorded so far for the current step.
    ///
    /// Steps that derive something from their own timings, e.g. an average to compare against
    /// another backend's, read them here before the runner drains them into the step result.
    pub fn recorded(&self) -> &[Measurement] {
        &self.recorded_measurements
    }

    /// The poll attempts recorded so far for the current step.
    pub fn recorded_attempts(&self) -> &[PollAttempt] {
        &self.recorded_attempts
    }

    /// Replace the result that will be recorded for the current step.
    ///
    /// For steps whose verdict is not a function of their own measurements, e.g. a comparison
    /// over earlier steps, or a step that had no valid input and must report why. The result's
    /// name is replaced with the step's label.
    pub fn record_result(&mut self, result: ScenarioResult) {
        self.pending_result = Some(result);
    }

    pub(crate) fn take_step_result(&mut self, label: &str) -> ScenarioResult {
        let measurements = std::mem::take(&mut self.recorded_measurements);
        let attempts = std::mem::take(&mut self.recorded_attempts);

        if let Some(mut result) = self.pending_result.take() {
            result.name = label.to_string();
            return result;
        }

        if measurements.is_empty() && attempts.is_empty() {
            return ScenarioResult::skipped(label, "no operations attempted");
        }

        ScenarioResult::from_recorded(label, measurements, attempts)
    }

    pub(crate) fn take_failed_step_result(&mut self, label: &str, reason: String) -> ScenarioResult {
        let mut result = self.take_step_result(label);
        result.passed = false;
        result.reason = Some(reason);
        result
    }

    pub(crate) fn take_env(&mut self) -> HashMap<String, String> {
        std::mem::take(&mut self.env)
    }
}
