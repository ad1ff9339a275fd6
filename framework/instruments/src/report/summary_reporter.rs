mod operations_table;

use crate::report::summary_reporter::operations_table::{float2, OperationRow};
use crate::report::ReportCollector;
use propagation_probe_report_model::{Measurement, ReportDocument};
use std::collections::HashMap;
use tabled::settings::Style;
use tabled::Table;

/// Keeps every operation in memory and prints a human-readable summary of the run at the end:
/// a per-operation aggregate table, one line per step, and the recommendation.
pub struct SummaryReporter {
    measurements: Vec<Measurement>,
}

impl Default for SummaryReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryReporter {
    pub fn new() -> Self {
        Self {
            measurements: Vec::new(),
        }
    }

    fn operation_rows(&self) -> Vec<OperationRow> {
        let mut rows = self
            .measurements
            .iter()
            .fold(
                HashMap::<String, Vec<&Measurement>>::new(),
                |mut acc, measurement| {
                    acc.entry(measurement.operation.clone())
                        .or_default()
                        .push(measurement);
                    acc
                },
            )
            .into_iter()
            .map(|(operation_id, measurements)| {
                let total_operations = measurements.len();
                let errors = measurements.iter().filter(|m| !m.succeeded).count();
                let total_duration_ms =
                    measurements.iter().map(|m| m.duration_ms).sum::<u64>() as f64;

                // Min/max are only meaningful over the operations that actually completed.
                let completed = measurements
                    .iter()
                    .filter(|m| m.succeeded)
                    .map(|m| m.duration_ms)
                    .collect::<Vec<_>>();

                OperationRow {
                    operation_id,
                    avg_time_ms: float2(total_duration_ms / total_operations as f64),
                    min_time_ms: float2(completed.iter().min().copied().unwrap_or(0) as f64),
                    max_time_ms: float2(completed.iter().max().copied().unwrap_or(0) as f64),
                    total_operations,
                    errors,
                    total_duration_ms: float2(total_duration_ms),
                }
            })
            .collect::<Vec<_>>();

        rows.sort_by(|a, b| a.operation_id.cmp(&b.operation_id));
        rows
    }

    fn print_summary(&self, report: &ReportDocument) {
        println!("\nSummary of operations");
        let mut table = Table::new(self.operation_rows());
        table.with(Style::modern());
        println!("{table}");

        println!(
            "\nScenario {} ({:?}), run {}",
            report.scenario_name, report.outcome, report.run_id
        );
        for result in &report.results {
            let marker = if result.passed { "✔" } else { "✘" };
            match (&result.metrics, &result.reason) {
                (Some(metrics), _) => println!(
                    "  {marker} {}: avg {:.2}ms, improvement {}%, consistent: {}",
                    result.name,
                    metrics.average_duration_ms,
                    metrics.percent_improvement,
                    metrics.immediately_consistent,
                ),
                (None, Some(reason)) => println!("  {marker} {}: {reason}", result.name),
                (None, None) => println!("  {marker} {}", result.name),
            }
        }

        let summary = &report.summary;
        println!(
            "\n{}/{} steps passed in {}ms",
            summary.successful_steps, summary.total_steps, summary.total_duration_ms
        );
        println!("{}", summary.recommendation);
    }
}

impl ReportCollector for SummaryReporter {
    fn add_operation(&mut self, measurement: &Measurement) {
        self.measurements.push(measurement.clone());
    }

    fn finalize(&self, report: &ReportDocument) {
        self.print_summary(report);
    }
}
