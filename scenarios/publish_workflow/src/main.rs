//! The end-to-end editorial loop: check prerequisites, branch, publish content, verify that
//! both backends serve it fresh, and recommend which backend editorial reads should use.

use github_propagation_runner::prelude::*;
use serde_json::json;

const DOCUMENT_QUERY: &str = "\
query ProbeDocument($relativePath: String!, $branch: String) {
  document(relativePath: $relativePath, branch: $branch) {
    sha
  }
}";

#[derive(Debug, Default)]
struct ScenarioValues {
    branch: Option<String>,
    file: Option<ProbeFile>,
    cms_metrics: Option<DerivedMetrics>,
    rest_metrics: Option<DerivedMetrics>,
}

impl UserValuesConstraint for ScenarioValues {}

fn setup(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    configure_clients(ctx)
}

/// Report the configuration checklist. Missing fields fail this step but do not abort the
/// run; the steps that truly cannot proceed without them bail on their own.
fn check_prerequisites(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    let checklist = ctx.get().config.checklist();
    let passed = checklist.is_complete() && ctx.get().config.github_token.is_some();

    ctx.record_result(ScenarioResult {
        name: "check-prerequisites".to_string(),
        passed,
        reason: Some(checklist.report().replace('\n', "; ")),
        measurements: Vec::new(),
        attempts: Vec::new(),
        metrics: None,
    });
    Ok(())
}

fn create_release_branch(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    require_write_access(ctx)?;
    let branch = create_probe_branch(ctx, "probe-release")?;
    ctx.get_mut().scenario_values.branch = branch;
    Ok(())
}

fn publish_content(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    let Some(branch) = ctx.get().scenario_values.branch.clone() else {
        ctx.record_result(ScenarioResult::skipped(
            "publish-content",
            "no release branch available from the branch step",
        ));
        return Ok(());
    };

    let file = commit_probe_file(ctx, &branch)?;
    ctx.get_mut().scenario_values.file = file;
    Ok(())
}

/// Ask the CMS query engine for the just-published document.
fn query_document_via_cms(
    ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>,
) -> HookResult {
    let (Some(branch), Some(file)) = (
        ctx.get().scenario_values.branch.clone(),
        ctx.get().scenario_values.file.clone(),
    ) else {
        ctx.record_result(ScenarioResult::skipped(
            "query-document-via-cms",
            "no published content available from the earlier steps",
        ));
        return Ok(());
    };

    let cms = require_cms(ctx)?;
    let variables = json!({
        "relativePath": file.path,
        "branch": branch,
    });
    ctx.timed("cms_execute_query", async move {
        Ok(cms.execute_query(DOCUMENT_QUERY, variables).await?)
    })?;

    Ok(())
}

fn verify_freshness_via_cms(
    ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>,
) -> HookResult {
    let (Some(branch), Some(file)) = (
        ctx.get().scenario_values.branch.clone(),
        ctx.get().scenario_values.file.clone(),
    ) else {
        ctx.record_result(ScenarioResult::skipped(
            "verify-freshness-via-cms",
            "no published content available from the earlier steps",
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

    let metrics = DerivedMetrics::compute(&[], ctx.recorded_attempts());
    ctx.get_mut().scenario_values.cms_metrics = Some(metrics);
    Ok(())
}

fn verify_freshness_via_rest(
    ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>,
) -> HookResult {
    let (Some(branch), Some(file)) = (
        ctx.get().scenario_values.branch.clone(),
        ctx.get().scenario_values.file.clone(),
    ) else {
        ctx.record_result(ScenarioResult::skipped(
            "verify-freshness-via-rest",
            "no published content available from the earlier steps",
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

    let metrics = DerivedMetrics::compute(&[], ctx.recorded_attempts());
    ctx.get_mut().scenario_values.rest_metrics = Some(metrics);
    Ok(())
}

fn compare_and_recommend(
    ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>,
) -> HookResult {
    let cms_metrics = ctx.get().scenario_values.cms_metrics.clone();
    let rest_metrics = ctx.get().scenario_values.rest_metrics.clone();

    let (Some(cms), Some(rest)) = (cms_metrics, rest_metrics) else {
        ctx.record_result(ScenarioResult::skipped(
            "compare-and-recommend",
            "freshness was not verified on both backends",
        ));
        return Ok(());
    };

    let passed = cms.passed();
    let reason = format!(
        "cms: avg {:.1}ms, consistent {}; rest: avg {:.1}ms, consistent {}; {}",
        cms.average_duration_ms,
        cms.immediately_consistent,
        rest.average_duration_ms,
        rest.immediately_consistent,
        if passed {
            "the content layer serves published content immediately, switch editorial reads to it"
        } else {
            "the content layer did not prove immediate consistency, keep reads on the workaround"
        }
    );
    log::info!("{reason}");

    ctx.record_result(ScenarioResult {
        name: "compare-and-recommend".to_string(),
        passed,
        reason: Some(reason),
        measurements: Vec::new(),
        attempts: Vec::new(),
        metrics: Some(cms),
    });
    Ok(())
}

fn main() -> ProbeResult<()> {
    let builder = ScenarioDefinitionBuilder::<GithubProbeContext<ScenarioValues>>::new_with_init(
        env!("CARGO_PKG_NAME"),
    )
    .use_setup(setup)
    .add_step("check-prerequisites", check_prerequisites)
    .add_step("create-release-branch", create_release_branch)
    .add_step("publish-content", publish_content)
    .add_step("query-document-via-cms", query_document_via_cms)
    .add_step("verify-freshness-via-cms", verify_freshness_via_cms)
    .add_step("verify-freshness-via-rest", verify_freshness_via_rest)
    .add_step("compare-and-recommend", compare_and_recommend)
    .use_teardown(cleanup_transient_resources);
    let strict = builder.cli().strict;

    let report = run(builder)?;

    let code = exit_code(&report, strict);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
