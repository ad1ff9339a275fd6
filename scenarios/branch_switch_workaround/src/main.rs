//! Exercises the cache-bypass workaround: committing to a freshly created branch and reading
//! through that branch's ref, instead of waiting out the propagation delay on the default
//! branch.

use github_propagation_runner::prelude::*;

#[derive(Debug, Default)]
struct ScenarioValues {
    branch: Option<String>,
    file: Option<ProbeFile>,
}

impl UserValuesConstraint for ScenarioValues {}

fn setup(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    configure_clients(ctx)?;
    require_write_access(ctx)?;
    Ok(())
}

fn create_work_branch(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    let branch = create_probe_branch(ctx, "probe-work")?;
    if branch.is_none() {
        log::warn!("The work branch was not created; the remaining steps will be skipped");
    }
    ctx.get_mut().scenario_values.branch = branch;
    Ok(())
}

fn commit_content_change(
    ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>,
) -> HookResult {
    let Some(branch) = ctx.get().scenario_values.branch.clone() else {
        ctx.record_result(ScenarioResult::skipped(
            "commit-content-change",
            "no work branch available from the create step",
        ));
        return Ok(());
    };

    let file = commit_probe_file(ctx, &branch)?;
    ctx.get_mut().scenario_values.file = file;
    Ok(())
}

/// Read the change back through the REST API at the new branch ref, which should bypass the
/// default branch's cache window entirely.
fn read_branch_via_rest(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    let (Some(branch), Some(file)) = (
        ctx.get().scenario_values.branch.clone(),
        ctx.get().scenario_values.file.clone(),
    ) else {
        ctx.record_result(ScenarioResult::skipped(
            "read-branch-via-rest",
            "no committed change available from the earlier steps",
        ));
        return Ok(());
    };

    let github = require_github(ctx)?;
    let marker = file.marker.clone();

    ctx.poll_consistency("github_get_content", &file.path, move |path| {
        let github = github.clone();
        let branch = branch.clone();
        let marker = marker.clone();
        async move {
            match github.get_content_raw(&path, Some(&branch)).await {
                Ok(body) => Ok(body.contains(&marker)),
                Err(e) if e.is_not_found() => Ok(false),
                Err(e) => Err(e.into()),
            }
        }
    })?;

    Ok(())
}

/// Read the same change through the CMS with its branch selector.
fn read_branch_via_cms(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    let (Some(branch), Some(file)) = (
        ctx.get().scenario_values.branch.clone(),
        ctx.get().scenario_values.file.clone(),
    ) else {
        ctx.record_result(ScenarioResult::skipped(
            "read-branch-via-cms",
            "no committed change available from the earlier steps",
        ));
        return Ok(());
    };

    let cms = require_cms(ctx)?;
    let marker = file.marker.clone();

    ctx.poll_consistency("cms_fetch_content", &file.path, move |path| {
        let cms = cms.clone();
        let branch = branch.clone();
        let marker = marker.clone();
        async move {
            match cms.fetch_content(&path, Some(&branch)).await {
                Ok(body) => Ok(body.contains(&marker)),
                Err(e) if e.is_not_found() => Ok(false),
                Err(e) => Err(e.into()),
            }
        }
    })?;

    Ok(())
}

fn main() -> ProbeResult<()> {
    let builder = ScenarioDefinitionBuilder::<GithubProbeContext<ScenarioValues>>::new_with_init(
        env!("CARGO_PKG_NAME"),
    )
    .use_setup(setup)
    .add_step("create-work-branch", create_work_branch)
    .add_step("commit-content-change", commit_content_change)
    .add_step("read-branch-via-rest", read_branch_via_rest)
    .add_step("read-branch-via-cms", read_branch_via_cms)
    .use_teardown(cleanup_transient_resources);
    let strict = builder.cli().strict;

    let report = run(builder)?;

    let code = exit_code(&report, strict);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
