use crate::report::ReportCollector;
use propagation_probe_report_model::{write_report, Measurement, ReportDocument};
use std::path::PathBuf;

/// Persists the report document to its fixed relative path, one file per scenario category.
///
/// Individual operations are ignored here; the document handed to [JsonFileReporter::finalize]
/// already contains every measurement.
pub struct JsonFileReporter {
    report_dir: PathBuf,
}

impl JsonFileReporter {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }
}

impl ReportCollector for JsonFileReporter {
    fn add_operation(&mut self, _measurement: &Measurement) {}

    fn finalize(&self, report: &ReportDocument) {
        match write_report(report, &self.report_dir) {
            Ok(path) => log::info!("Report written to {}", path.display()),
            // The caller still holds the in-memory document, so a failed write only costs the
            // persisted artifact.
            Err(e) => log::warn!(
                "Failed to persist report for {}: {e:?}",
                report.scenario_name
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_report;
    use propagation_probe_report_model::load_report;

    #[test]
    fn writes_one_document_per_scenario_category() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = JsonFileReporter::new(dir.path());
        let report = sample_report(vec![]);

        reporter.finalize(&report);

        let path = dir.path().join("content_read_compare.json");
        let loaded = load_report(std::fs::File::open(path).unwrap()).unwrap();
        assert_eq!(report.run_id, loaded.run_id);
    }

    #[test]
    fn unwritable_directory_does_not_panic() {
        let reporter = JsonFileReporter::new("/proc/does-not-exist/reports");
        reporter.finalize(&sample_report(vec![]));
    }
}
