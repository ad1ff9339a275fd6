mod cli;
mod context;
mod definition;
mod executor;
mod init;
mod monitor;
mod progress;
mod run;
mod shutdown;
mod types;

pub mod prelude {
    pub use crate::cli::{ProbeScenarioCli, ReporterOpt};
    pub use crate::context::{StepContext, UserValuesConstraint};
    pub use crate::definition::{HookResult, ScenarioDefinitionBuilder};
    pub use crate::run::{exit_code, run};
    pub use crate::types::ProbeResult;

    pub use propagation_probe_core::prelude::StepBailError;
    pub use propagation_probe_instruments::{
        measure, ConsistencyProbe, OperationRecord, Reporter, DEFAULT_POLL_DELAYS_MS,
    };
    pub use propagation_probe_report_model::{
        immediately_consistent, percent_improvement, DerivedMetrics, Measurement, PollAttempt,
        ReportDocument, RunOutcome, ScenarioResult, BASELINE_PROPAGATION_DELAY_MS,
    };
}
