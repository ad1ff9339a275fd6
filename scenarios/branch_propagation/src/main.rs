use github_propagation_runner::prelude::*;

#[derive(Debug, Default)]
struct ScenarioValues {
    branches: Vec<String>,
}

impl UserValuesConstraint for ScenarioValues {}

fn setup(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    configure_clients(ctx)?;
    require_write_access(ctx)?;
    Ok(())
}

/// Create two branches off the default branch head at the same time.
///
/// This is the one deliberately concurrent pair in the whole suite: both creation calls are
/// issued at once and joined, to exercise simultaneous creation against the backend. Polling
/// the branches afterwards stays strictly sequential.
fn create_branches_concurrently(
    ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>,
) -> HookResult {
    let github = require_github(ctx)?;
    let default_branch = ctx.get().config.default_branch.clone();

    let head = {
        let github = github.clone();
        let branch = default_branch.clone();
        ctx.timed("github_get_branch_ref", async move {
            Ok(github.get_branch_ref(&branch).await?)
        })?
    };
    let Some(head) = head else {
        log::warn!("Cannot resolve the default branch head; no branches will be created");
        return Ok(());
    };

    let left = ctx.unique_name("probe-branch-left");
    let right = ctx.unique_name("probe-branch-right");

    let executor = ctx.executor().clone();
    let sha = head.object.sha;
    let (left_result, right_result) = executor.execute_in_place(async {
        let create = |name: String| {
            let github = github.clone();
            let sha = sha.clone();
            async move { github.create_branch_ref(&name, &sha).await }
        };

        Ok(futures::join!(
            measure("github_create_branch_ref", || create(left.clone())),
            measure("github_create_branch_ref", || create(right.clone())),
        ))
    })?;

    for (name, (measurement, outcome)) in [(left, left_result), (right, right_result)] {
        ctx.record_measurement(measurement);
        match outcome {
            Ok(_) => {
                ctx.get_mut()
                    .resources
                    .push(TransientResource::branch(name.clone()));
                ctx.get_mut().scenario_values.branches.push(name);
            }
            Err(e) => log::warn!("Branch {name} was not created: {e}"),
        }
    }

    Ok(())
}

/// Poll each created branch, one after the other, until its ref resolves.
fn poll_branches_via_rest(
    ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>,
) -> HookResult {
    let branches = ctx.get().scenario_values.branches.clone();
    if branches.is_empty() {
        ctx.record_result(ScenarioResult::skipped(
            "poll-branches-via-rest",
            "no branches available from the create step",
        ));
        return Ok(());
    }

    let github = require_github(ctx)?;
    for branch in branches {
        let github = github.clone();
        ctx.poll_consistency("github_get_branch_ref", &branch, move |name| {
            let github = github.clone();
            async move {
                match github.get_branch_ref(&name).await {
                    Ok(_) => Ok(true),
                    Err(e) if e.is_not_found() => Ok(false),
                    Err(e) => Err(e.into()),
                }
            }
        })?;
    }

    Ok(())
}

/// Confirm both branches appear in the full branch listing.
fn verify_branch_listing(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    let branches = ctx.get().scenario_values.branches.clone();
    if branches.is_empty() {
        ctx.record_result(ScenarioResult::skipped(
            "verify-branch-listing",
            "no branches available from the create step",
        ));
        return Ok(());
    }

    let github = require_github(ctx)?;
    let listing = {
        let github = github.clone();
        ctx.timed("github_list_branches", async move {
            Ok(github.list_branches().await?)
        })?
    };

    if let Some(listing) = listing {
        let missing = branches
            .iter()
            .filter(|branch| !listing.iter().any(|info| &info.name == *branch))
            .cloned()
            .collect::<Vec<_>>();

        if !missing.is_empty() {
            let mut result = ScenarioResult::from_recorded(
                "verify-branch-listing",
                ctx.recorded().to_vec(),
                Vec::new(),
            );
            result.passed = false;
            result.reason = Some(format!("branches absent from listing: {}", missing.join(", ")));
            ctx.record_result(result);
        }
    }

    Ok(())
}

fn main() -> ProbeResult<()> {
    let builder = ScenarioDefinitionBuilder::<GithubProbeContext<ScenarioValues>>::new_with_init(
        env!("CARGO_PKG_NAME"),
    )
    .use_setup(setup)
    .add_step("create-branches", create_branches_concurrently)
    .add_step("poll-branches-via-rest", poll_branches_via_rest)
    .add_step("verify-branch-listing", verify_branch_listing)
    .use_teardown(cleanup_transient_resources);
    let strict = builder.cli().strict;

    let report = run(builder)?;

    let code = exit_code(&report, strict);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
