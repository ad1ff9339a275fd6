use github_propagation_runner::prelude::*;

#[derive(Debug, Default)]
struct ScenarioValues {
    file: Option<ProbeFile>,
}

impl UserValuesConstraint for ScenarioValues {}

fn setup(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    configure_clients(ctx)?;
    require_write_access(ctx)?;
    Ok(())
}

/// Create one commit on the default branch by adding a uniquely named file.
fn create_probe_commit(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    let branch = ctx.get().config.default_branch.clone();
    let file = commit_probe_file(ctx, &branch)?;
    if file.is_none() {
        log::warn!("The probe commit was not created; the polling steps will be skipped");
    }
    ctx.get_mut().scenario_values.file = file;
    Ok(())
}

/// Poll the REST commit listing until the new commit shows up.
fn poll_commit_via_rest(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    let Some(file) = ctx.get().scenario_values.file.clone() else {
        ctx.record_result(ScenarioResult::skipped(
            "poll-commit-via-rest",
            "no commit available from the create step",
        ));
        return Ok(());
    };

    let github = require_github(ctx)?;
    let branch = ctx.get().config.default_branch.clone();

    ctx.poll_consistency("github_list_commits", &file.commit_sha, move |sha| {
        let github = github.clone();
        let branch = branch.clone();
        async move {
            match github.list_commits(&branch, 10).await {
                Ok(commits) => Ok(commits.iter().any(|commit| commit.sha == sha)),
                Err(e) if e.is_not_found() => Ok(false),
                Err(e) => Err(e.into()),
            }
        }
    })?;

    Ok(())
}

/// Poll the CMS content endpoint until it serves the committed body.
fn poll_content_via_cms(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    let Some(file) = ctx.get().scenario_values.file.clone() else {
        ctx.record_result(ScenarioResult::skipped(
            "poll-content-via-cms",
            "no commit available from the create step",
        ));
        return Ok(());
    };

    let cms = require_cms(ctx)?;
    let marker = file.marker.clone();

    ctx.poll_consistency("cms_fetch_content", &file.path, move |path| {
        let cms = cms.clone();
        let marker = marker.clone();
        async move {
            match cms.fetch_content(&path, None).await {
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
    .add_step("create-probe-commit", create_probe_commit)
    .add_step("poll-commit-via-rest", poll_commit_via_rest)
    .add_step("poll-content-via-cms", poll_content_via_cms)
    .use_teardown(cleanup_transient_resources);
    let strict = builder.cli().strict;

    let report = run(builder)?;

    let code = exit_code(&report, strict);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
