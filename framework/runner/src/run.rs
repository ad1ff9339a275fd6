use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use nanoid::nanoid;
use sysinfo::System;

use crate::cli::ReporterOpt;
use crate::context::{StepContext, UserValuesConstraint};
use crate::definition::ScenarioDefinitionBuilder;
use crate::executor::Executor;
use crate::monitor::start_monitor;
use crate::progress::step_progress;
use crate::shutdown::start_shutdown_listener;
use propagation_probe_core::prelude::{ShutdownSignalError, StepBailError};
use propagation_probe_instruments::{ReportConfig, DEFAULT_POLL_DELAYS_MS};
use propagation_probe_report_model::{
    EnvironmentDescriptor, ReportDocument, ReportSummary, RunOutcome, ScenarioResult,
};

/// Execute a scenario and return its assembled report document.
///
/// Steps run strictly in declared order. A step error is recorded as a failed step result and
/// the pipeline continues; a [StepBailError] or cancellation by the shutdown signal abandons the
/// remaining steps and marks the run failed. Teardown and report finalization run on every path,
/// so an interrupted or bailed run still leaves a report behind. Only a setup error propagates
/// out of this function, and even then the partial report has been finalized first.
pub fn run<V: UserValuesConstraint>(
    definition: ScenarioDefinitionBuilder<V>,
) -> anyhow::Result<ReportDocument> {
    let definition = definition.build()?;

    log::info!("Running scenario: {}", definition.name);

    let started_at = Utc::now();
    let cli = &definition.cli;

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime)?;
    let executor = Arc::new(Executor::new(runtime, shutdown_handle.clone()));

    let run_id = cli.run_id.clone().unwrap_or_else(|| nanoid!());
    let delays_ms = if cli.delays.is_empty() {
        DEFAULT_POLL_DELAYS_MS.to_vec()
    } else {
        let mut delays = cli.delays.clone();
        delays.sort_unstable();
        delays
    };

    let reporter = Arc::new(
        match cli.reporter {
            ReporterOpt::Summary => ReportConfig::default().enable_summary(),
            ReporterOpt::Json => ReportConfig::default().enable_json_file(cli.report_dir.clone()),
            ReporterOpt::Both => ReportConfig::default()
                .enable_summary()
                .enable_json_file(cli.report_dir.clone()),
            ReporterOpt::Noop => ReportConfig::default(),
        }
        .init(),
    );

    let mut context = StepContext::<V>::new(
        executor,
        reporter.clone(),
        shutdown_handle.new_listener(),
        run_id.clone(),
        cli.samples,
        delays_ms.clone(),
    );

    let mut outcome = RunOutcome::Completed;
    let mut results: Vec<ScenarioResult> = Vec::new();
    let mut setup_error: Option<anyhow::Error> = None;

    if let Some(e) = definition.setup_fn.and_then(|setup_fn| setup_fn(&mut context).err()) {
        log::error!("Scenario setup failed: {e:?}");
        outcome = RunOutcome::Failed;
        for (index, step) in definition.steps.iter().enumerate() {
            results.push(ScenarioResult::skipped(
                step_label(index, &step.name),
                "skipped: scenario setup failed",
            ));
        }
        setup_error = Some(e);
    } else {
        start_monitor(shutdown_handle.new_listener());

        let pb = step_progress(definition.steps.len() as u64, !cli.no_progress);
        let mut abandoned: Option<String> = None;

        for (index, step) in definition.steps.iter().enumerate() {
            let label = step_label(index, &step.name);

            if let Some(reason) = &abandoned {
                results.push(ScenarioResult::skipped(&label, reason.clone()));
                continue;
            }

            pb.set_message(step.name.clone());
            match (step.hook)(&mut context) {
                Ok(()) => {
                    let result = context.take_step_result(&label);
                    log::info!(
                        "Step {label} finished, passed: {}",
                        result.passed
                    );
                    results.push(result);
                }
                Err(e) if e.is::<StepBailError>() || e.is::<ShutdownSignalError>() => {
                    log::error!("Step {label} abandoned the scenario: {e:?}");
                    results.push(context.take_failed_step_result(&label, format!("{e:#}")));
                    outcome = RunOutcome::Failed;
                    abandoned = Some(format!("skipped: {e}"));
                }
                Err(e) => {
                    log::error!("Step {label} failed: {e:?}");
                    results.push(context.take_failed_step_result(&label, format!("{e:#}")));
                }
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
    }

    // Teardown runs on both terminal paths. Its operations are recorded under a `cleanup`
    // entry that never affects the verdict: deleting a transient resource that is already gone
    // is not a scenario failure.
    if let Some(teardown_fn) = definition.teardown_fn {
        context.begin_teardown();
        if let Err(e) = teardown_fn(&mut context) {
            log::error!("Teardown failed: {e:?}");
        }
        let mut cleanup = context.take_step_result("cleanup");
        cleanup.passed = true;
        cleanup.reason.get_or_insert_with(|| "best-effort cleanup".to_string());
        results.push(cleanup);
    }

    // Stops the monitor thread and any in-flight listeners.
    shutdown_handle.shutdown();

    let environment = EnvironmentDescriptor {
        hostname: System::host_name(),
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        pid: std::process::id(),
        run_mode: cli.reporter.to_string(),
        env: context.take_env(),
    };

    let summary = ReportSummary::from_results(&results);
    let document = ReportDocument {
        run_id,
        scenario_name: definition.name.clone(),
        started_at,
        outcome,
        configured_delays_ms: delays_ms,
        environment,
        results,
        summary,
    };

    reporter.finalize(&document);

    match setup_error {
        Some(e) => Err(e.context(format!("Scenario {} failed in setup", definition.name))),
        None => Ok(document),
    }
}

/// Map a finished run to a process exit code. The default behavior is to always exit 0 and let
/// the report carry the verdict; `--strict` makes a non-passing run visible to CI.
pub fn exit_code(report: &ReportDocument, strict: bool) -> i32 {
    if strict && !report.summary.passed {
        1
    } else {
        0
    }
}

fn step_label(index: usize, name: &str) -> String {
    format!("step-{}-{}", index + 1, name)
}
