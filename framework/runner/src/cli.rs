use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(about, long_about = None)]
pub struct ProbeScenarioCli {
    /// The number of timed samples to take per read step
    #[clap(long, default_value = "5")]
    pub samples: usize,

    /// Poll delays in milliseconds, comma separated.
    ///
    /// Each delay is measured from the creation of the resource under test, so the list is
    /// sorted ascending before use. Defaults to 50,100,500,1000,2000.
    #[clap(long, value_delimiter = ',')]
    pub delays: Vec<u64>,

    /// Which reporters to run when the scenario finishes
    #[clap(long, value_enum, default_value_t = ReporterOpt::Both)]
    pub reporter: ReporterOpt,

    /// Directory the JSON report documents are written to, one file per scenario
    #[clap(long, default_value = "reports")]
    pub report_dir: PathBuf,

    /// Use a fixed run id instead of a generated one
    #[clap(long)]
    pub run_id: Option<String>,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at
    /// by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Exit nonzero when the scenario does not pass.
    ///
    /// By default the exit code is 0 regardless of the outcome and the verdict lives in the
    /// report, which is what interactive use wants.
    #[clap(long, default_value = "false")]
    pub strict: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterOpt {
    /// Print the human-readable summary to stdout
    Summary,
    /// Write the JSON report document
    Json,
    /// Summary and JSON document
    Both,
    /// Discard everything; used by tests
    Noop,
}

impl std::fmt::Display for ReporterOpt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReporterOpt::Summary => write!(f, "summary"),
            ReporterOpt::Json => write!(f, "json"),
            ReporterOpt::Both => write!(f, "both"),
            ReporterOpt::Noop => write!(f, "noop"),
        }
    }
}
