use github_propagation_runner::prelude::*;
use pretty_assertions::assert_eq;

#[derive(Debug, Default)]
struct ScenarioValues;

impl UserValuesConstraint for ScenarioValues {}

fn sample_cli_cfg() -> ProbeScenarioCli {
    ProbeScenarioCli {
        samples: 1,
        delays: vec![10],
        reporter: ReporterOpt::Noop,
        report_dir: "reports".into(),
        run_id: Some("cleanup-test".to_string()),
        no_progress: true,
        strict: false,
    }
}

/// A client pointed at a closed local port: every call fails fast, which is all these tests
/// need, since the guarantee under test is that deletions are attempted, not that they work.
fn setup(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    let github = GithubClient::new("http://127.0.0.1:9", "acme", "site", "token123")?;
    ctx.get_mut().github = Some(github);
    Ok(())
}

fn register_resources_then_fail(
    ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>,
) -> HookResult {
    let branch = "probe-branch-left-1714650000000".to_string();
    ctx.get_mut()
        .resources
        .push(TransientResource::branch(branch.clone()));
    ctx.get_mut()
        .resources
        .push(TransientResource::file(branch, "probe/data.md", "abc123"));

    Err(anyhow::anyhow!(
        "creation reported failure after registering resources"
    ))
}

fn fail_before_registering(
    _ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>,
) -> HookResult {
    Err(anyhow::anyhow!(
        "creation call exploded before anything was registered"
    ))
}

#[test]
fn every_tracked_resource_gets_exactly_one_cleanup_attempt() {
    let scenario = ScenarioDefinitionBuilder::<GithubProbeContext<ScenarioValues>>::new(
        "every_tracked_resource_gets_exactly_one_cleanup_attempt",
        sample_cli_cfg(),
    )
    .use_setup(setup)
    .add_step("create", register_resources_then_fail)
    .use_teardown(cleanup_transient_resources);

    let report = run(scenario).unwrap();

    assert_eq!(RunOutcome::Completed, report.outcome);
    assert!(report.summary.failed_steps >= 1);

    let cleanup = report.results.last().unwrap();
    assert_eq!("cleanup", cleanup.name);
    assert!(cleanup.passed);

    // One deletion attempt per tracked resource, file before the branch that carries it.
    assert_eq!(2, cleanup.measurements.len());
    assert_eq!("github_delete_content", cleanup.measurements[0].operation);
    assert_eq!("github_delete_branch_ref", cleanup.measurements[1].operation);

    // The backend is unreachable here, so the attempts fail, and a failed attempt still
    // carries its error without failing the cleanup entry.
    assert!(cleanup.measurements.iter().all(|m| !m.succeeded));
    assert!(cleanup
        .measurements
        .iter()
        .all(|m| m.error.as_deref().is_some_and(|e| !e.is_empty())));
}

#[test]
fn cleanup_with_zero_resources_records_nothing_and_does_not_fail() {
    let scenario = ScenarioDefinitionBuilder::<GithubProbeContext<ScenarioValues>>::new(
        "cleanup_with_zero_resources_records_nothing_and_does_not_fail",
        sample_cli_cfg(),
    )
    .use_setup(setup)
    .add_step("create", fail_before_registering)
    .use_teardown(cleanup_transient_resources);

    let report = run(scenario).unwrap();

    assert_eq!(RunOutcome::Completed, report.outcome);
    assert_eq!(1, report.summary.failed_steps);
    assert_eq!(2, report.summary.total_steps);

    let cleanup = report.results.last().unwrap();
    assert_eq!("cleanup", cleanup.name);
    assert!(cleanup.passed);
    assert!(cleanup.measurements.is_empty());
}
