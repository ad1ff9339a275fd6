use crate::config::ProbeConfig;
use crate::resources::TransientResource;
use cms_probe_client::prelude::CmsClient;
use github_probe_client::prelude::GithubClient;
use propagation_probe_runner::prelude::UserValuesConstraint;

/// The probe-specific slice of the step context.
///
/// The clients are populated by [crate::common::configure_clients] in the scenario's setup
/// hook; `scenario_values` is whatever per-scenario state the steps pass between each other.
#[derive(Debug, Default)]
pub struct GithubProbeContext<SV: UserValuesConstraint = ()> {
    pub config: ProbeConfig,
    pub github: Option<GithubClient>,
    pub cms: Option<CmsClient>,
    pub resources: Vec<TransientResource>,
    pub scenario_values: SV,
}

impl<SV: UserValuesConstraint> UserValuesConstraint for GithubProbeContext<SV> {}
