mod common;
mod config;
mod context;
mod resources;

pub mod prelude {
    /// Common operations for probe scenarios.
    ///
    /// This is a good place to start if you are writing a new scenario.
    pub use crate::common::*;

    pub use crate::config::{PrerequisiteChecklist, ProbeConfig};
    pub use crate::context::GithubProbeContext;
    pub use crate::resources::TransientResource;

    /// Re-export of the `propagation_probe_runner` prelude.
    ///
    /// This is for convenience so that scenarios can depend on a single crate for the runner.
    pub use propagation_probe_runner::prelude::*;

    /// Re-exports of the backend clients for convenience.
    pub use cms_probe_client::prelude::*;
    pub use github_probe_client::prelude::*;
}
