use pretty_assertions::assert_eq;
use propagation_probe_runner::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Default, Debug)]
struct ScenarioValues {
    created: Vec<String>,
}

impl UserValuesConstraint for ScenarioValues {}

fn sample_cli_cfg() -> ProbeScenarioCli {
    ProbeScenarioCli {
        samples: 2,
        delays: vec![10, 20, 30],
        reporter: ReporterOpt::Noop,
        report_dir: "reports".into(),
        run_id: Some("test-run".to_string()),
        no_progress: true,
        strict: false,
    }
}

fn quick_read(ctx: &mut StepContext<ScenarioValues>) -> HookResult {
    ctx.timed("quick_read", async { Ok(()) })?;
    Ok(())
}

#[test]
fn propagate_error_in_setup_hook() {
    fn setup(_ctx: &mut StepContext<ScenarioValues>) -> HookResult {
        Err(anyhow::anyhow!("Error in setup hook"))
    }

    let scenario =
        ScenarioDefinitionBuilder::<ScenarioValues>::new("propagate_error_in_setup_hook", sample_cli_cfg())
            .use_setup(setup)
            .add_step("read", quick_read);

    let result = run(scenario);

    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("failed in setup"));
}

#[test]
fn step_error_is_recorded_and_the_run_continues() {
    fn failing_create(_ctx: &mut StepContext<ScenarioValues>) -> HookResult {
        Err(anyhow::anyhow!("branch creation rejected"))
    }

    let scenario = ScenarioDefinitionBuilder::<ScenarioValues>::new(
        "step_error_is_recorded_and_the_run_continues",
        sample_cli_cfg(),
    )
    .add_step("create", failing_create)
    .add_step("read", quick_read);

    let report = run(scenario).unwrap();

    assert_eq!(RunOutcome::Completed, report.outcome);
    assert_eq!(2, report.summary.total_steps);
    assert_eq!(1, report.summary.failed_steps);

    let failed = &report.results[0];
    assert_eq!("step-1-create", failed.name);
    assert!(!failed.passed);
    assert!(failed
        .reason
        .as_deref()
        .is_some_and(|r| r.contains("branch creation rejected")));
    assert!(report.results[1].passed);
}

#[test]
fn bail_abandons_remaining_steps_but_reports_them() {
    fn bail(_ctx: &mut StepContext<ScenarioValues>) -> HookResult {
        Err(StepBailError::new("credentials absent").into())
    }

    let scenario = ScenarioDefinitionBuilder::<ScenarioValues>::new(
        "bail_abandons_remaining_steps_but_reports_them",
        sample_cli_cfg(),
    )
    .add_step("read", quick_read)
    .add_step("create", bail)
    .add_step("poll", quick_read);

    let report = run(scenario).unwrap();

    assert_eq!(RunOutcome::Failed, report.outcome);
    assert_eq!(3, report.summary.total_steps);
    assert!(report.results[0].passed);
    assert!(!report.results[1].passed);
    assert_eq!("step-3-poll", report.results[2].name);
    assert!(report.results[2]
        .reason
        .as_deref()
        .is_some_and(|r| r.starts_with("skipped")));
}

#[test]
fn teardown_runs_even_when_a_step_fails() {
    static TEARDOWN_RAN: AtomicBool = AtomicBool::new(false);

    fn failing_create(_ctx: &mut StepContext<ScenarioValues>) -> HookResult {
        Err(anyhow::anyhow!("creation call exploded"))
    }

    fn teardown(ctx: &mut StepContext<ScenarioValues>) -> HookResult {
        TEARDOWN_RAN.store(true, Ordering::SeqCst);
        // Nothing was created, so there is nothing to delete; that must not be an error.
        assert!(ctx.get().created.is_empty());
        Ok(())
    }

    let scenario = ScenarioDefinitionBuilder::<ScenarioValues>::new(
        "teardown_runs_even_when_a_step_fails",
        sample_cli_cfg(),
    )
    .add_step("create", failing_create)
    .use_teardown(teardown);

    let report = run(scenario).unwrap();

    assert!(TEARDOWN_RAN.load(Ordering::SeqCst));
    assert!(report.summary.failed_steps >= 1);
    // One declared step plus the cleanup entry, which never affects the verdict.
    assert_eq!(2, report.summary.total_steps);
    let cleanup = report.results.last().unwrap();
    assert_eq!("cleanup", cleanup.name);
    assert!(cleanup.passed);
    assert!(cleanup.measurements.is_empty());
}

#[test]
fn concurrent_creation_then_sequential_polls_pass() {
    fn create_branches(ctx: &mut StepContext<ScenarioValues>) -> HookResult {
        let executor = ctx.executor().clone();
        let (left, right) = executor.execute_in_place(async {
            let create = |name: &'static str, work: u64| async move {
                tokio::time::sleep(Duration::from_millis(work)).await;
                Ok::<_, anyhow::Error>(name.to_string())
            };
            Ok(futures::join!(
                measure("create_branch", || create("probe-left", 120)),
                measure("create_branch", || create("probe-right", 135)),
            ))
        })?;

        for (measurement, outcome) in [left, right] {
            ctx.record_measurement(measurement);
            if let Ok(name) = outcome {
                ctx.get_mut().created.push(name);
            }
        }
        Ok(())
    }

    fn poll_branches(ctx: &mut StepContext<ScenarioValues>) -> HookResult {
        for branch in ctx.get().created.clone() {
            let mut queries = 0;
            ctx.poll_consistency("poll_branch", &branch, move |_| {
                queries += 1;
                let found = queries > 1;
                async move { Ok(found) }
            })?;
        }
        Ok(())
    }

    let scenario = ScenarioDefinitionBuilder::<ScenarioValues>::new(
        "concurrent_creation_then_sequential_polls_pass",
        sample_cli_cfg(),
    )
    .add_step("create-branches", create_branches)
    .add_step("poll-branches", poll_branches);

    let report = run(scenario).unwrap();

    assert_eq!(RunOutcome::Completed, report.outcome);
    assert!(report.summary.passed);
    assert_eq!(report.summary.total_steps, report.summary.successful_steps);

    let create = &report.results[0];
    assert_eq!(2, create.measurements.len());
    assert!(create.measurements.iter().all(|m| m.duration_ms >= 120));

    let poll = &report.results[1];
    // Two branches, three configured delays each, shortest-delay misses tolerated.
    assert_eq!(6, poll.attempts.len());
    assert!(poll.passed);
}

#[test]
fn strict_mode_maps_a_failing_run_to_a_nonzero_exit() {
    fn failing_create(_ctx: &mut StepContext<ScenarioValues>) -> HookResult {
        Err(anyhow::anyhow!("nope"))
    }

    let scenario = ScenarioDefinitionBuilder::<ScenarioValues>::new(
        "strict_mode_maps_a_failing_run_to_a_nonzero_exit",
        sample_cli_cfg(),
    )
    .add_step("create", failing_create);

    let report = run(scenario).unwrap();

    assert_eq!(0, exit_code(&report, false));
    assert_eq!(1, exit_code(&report, true));
}
