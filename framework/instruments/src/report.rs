mod json_file_reporter;
mod summary_reporter;

use parking_lot::Mutex;
use propagation_probe_report_model::{Measurement, ReportDocument};
use std::path::PathBuf;

pub use json_file_reporter::JsonFileReporter;
pub use summary_reporter::SummaryReporter;

/// A sink for the run's measurements and its final report document.
pub trait ReportCollector {
    /// Called once for every finalized measurement, in the order operations settle.
    fn add_operation(&mut self, measurement: &Measurement);

    /// Called exactly once, after teardown, with the assembled report document.
    fn finalize(&self, report: &ReportDocument);
}

/// Selects the report collectors for a run.
///
/// With nothing enabled the reporter is a no-op, which is what tests want.
#[derive(Default)]
pub struct ReportConfig {
    summary: bool,
    json_dir: Option<PathBuf>,
}

impl ReportConfig {
    /// Print a human-readable summary to stdout when the run finishes.
    pub fn enable_summary(mut self) -> Self {
        self.summary = true;
        self
    }

    /// Persist the report document to its fixed path under `report_dir`.
    pub fn enable_json_file(mut self, report_dir: impl Into<PathBuf>) -> Self {
        self.json_dir = Some(report_dir.into());
        self
    }

    pub fn init(self) -> Reporter {
        let mut collectors: Vec<Box<dyn ReportCollector + Send>> = Vec::new();
        if self.summary {
            collectors.push(Box::new(SummaryReporter::new()));
        }
        if let Some(dir) = self.json_dir {
            collectors.push(Box::new(JsonFileReporter::new(dir)));
        }
        Reporter {
            collectors: Mutex::new(collectors),
        }
    }
}

/// Fans measurements and the final document out to the configured collectors.
pub struct Reporter {
    collectors: Mutex<Vec<Box<dyn ReportCollector + Send>>>,
}

impl Reporter {
    pub fn add_operation(&self, measurement: &Measurement) {
        for collector in self.collectors.lock().iter_mut() {
            collector.add_operation(measurement);
        }
    }

    /// Hand the assembled report to every collector. Never raises: a collector that cannot
    /// persist its output logs the failure, and the in-memory document stays available to the
    /// caller either way.
    pub fn finalize(&self, report: &ReportDocument) {
        for collector in self.collectors.lock().iter() {
            collector.finalize(report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use propagation_probe_report_model::{
        EnvironmentDescriptor, ReportSummary, RunOutcome, ScenarioResult,
    };

    pub(crate) fn sample_report(results: Vec<ScenarioResult>) -> ReportDocument {
        let summary = ReportSummary::from_results(&results);
        ReportDocument {
            run_id: "test-run".to_string(),
            scenario_name: "content_read_compare".to_string(),
            started_at: Utc::now(),
            outcome: RunOutcome::Completed,
            configured_delays_ms: vec![50, 100],
            environment: EnvironmentDescriptor::default(),
            results,
            summary,
        }
    }

    #[test]
    fn empty_reporter_is_a_noop() {
        let reporter = ReportConfig::default().init();
        reporter.add_operation(&Measurement::success("op", Utc::now(), 1));
        reporter.finalize(&sample_report(vec![]));
    }
}
