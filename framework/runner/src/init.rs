use crate::cli::ProbeScenarioCli;
use clap::Parser;

/// Initialise the CLI and logging for a probe scenario.
pub(crate) fn init() -> ProbeScenarioCli {
    env_logger::init();

    ProbeScenarioCli::parse()
}
