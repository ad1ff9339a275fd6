use github_propagation_runner::prelude::*;

#[derive(Debug, Default)]
struct ScenarioValues {
    cms_average_ms: Option<f64>,
    rest_average_ms: Option<f64>,
}

impl UserValuesConstraint for ScenarioValues {}

fn setup(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    configure_clients(ctx)
}

fn read_via_cms(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    let cms = require_cms(ctx)?;
    let path = ctx.get().config.content_path.clone();

    for _ in 0..ctx.samples() {
        let cms = cms.clone();
        let path = path.clone();
        ctx.timed("cms_fetch_content", async move {
            Ok(cms.fetch_content(&path, None).await?)
        })?;
    }

    let average = (!ctx.recorded().is_empty())
        .then(|| DerivedMetrics::compute(ctx.recorded(), &[]).average_duration_ms);
    ctx.get_mut().scenario_values.cms_average_ms = average;
    Ok(())
}

fn read_via_rest(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    let github = require_github(ctx)?;
    let path = ctx.get().config.content_path.clone();

    for _ in 0..ctx.samples() {
        let github = github.clone();
        let path = path.clone();
        ctx.timed("github_get_content", async move {
            Ok(github.get_content_raw(&path, None).await?)
        })?;
    }

    let average = (!ctx.recorded().is_empty())
        .then(|| DerivedMetrics::compute(ctx.recorded(), &[]).average_duration_ms);
    ctx.get_mut().scenario_values.rest_average_ms = average;
    Ok(())
}

fn compare_backends(ctx: &mut StepContext<GithubProbeContext<ScenarioValues>>) -> HookResult {
    let cms_average = ctx.get().scenario_values.cms_average_ms;
    let rest_average = ctx.get().scenario_values.rest_average_ms;

    match (cms_average, rest_average) {
        (Some(cms_avg), Some(rest_avg)) => {
            let metrics = DerivedMetrics {
                average_duration_ms: cms_avg,
                success_rate: 1.0,
                percent_improvement: percent_improvement(cms_avg),
                immediately_consistent: true,
            };
            let passed = metrics.passed();
            let reason = format!(
                "cms avg {cms_avg:.1}ms, rest avg {rest_avg:.1}ms, improvement over the \
                 five-minute propagation baseline {}%",
                metrics.percent_improvement
            );
            log::info!("{reason}");

            ctx.record_result(ScenarioResult {
                name: "compare".to_string(),
                passed,
                reason: Some(reason),
                measurements: Vec::new(),
                attempts: Vec::new(),
                metrics: Some(metrics),
            });
        }
        _ => {
            ctx.record_result(ScenarioResult::skipped(
                "compare",
                "a read step produced no samples to compare",
            ));
        }
    }

    Ok(())
}

fn main() -> ProbeResult<()> {
    let builder = ScenarioDefinitionBuilder::<GithubProbeContext<ScenarioValues>>::new_with_init(
        env!("CARGO_PKG_NAME"),
    )
    .use_setup(setup)
    .add_step("read-via-cms", read_via_cms)
    .add_step("read-via-rest", read_via_rest)
    .add_step("compare-backends", compare_backends)
    .use_teardown(cleanup_transient_resources);
    let strict = builder.cli().strict;

    let report = run(builder)?;

    let code = exit_code(&report, strict);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
