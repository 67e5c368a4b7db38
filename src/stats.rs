//! Run-level counters: totals, active and terminated postcodes, coordinate
//! coverage, elapsed time and throughput.

use std::time::{Duration, Instant};

use log::info;

use crate::{
    ingest::{FileResult, TERMINATION_COLUMN},
    record::FlatRecord,
};

#[derive(Debug, Clone)]
pub struct ProcessingStats {
    started: Instant,
    total: usize,
    active: usize,
    terminated: usize,
    with_coordinates: usize,
    files: usize,
    processing_time: Option<Duration>,
}

impl ProcessingStats {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            total: 0,
            active: 0,
            terminated: 0,
            with_coordinates: 0,
            files: 0,
            processing_time: None,
        }
    }

    /// Counts one file's retained records plus the terminated rows the
    /// pipeline dropped before extraction.
    pub fn record_file(&mut self, result: &FileResult) {
        self.files += 1;
        self.record(&result.records, result.terminated_skipped);
    }

    pub fn record(&mut self, records: &[FlatRecord], terminated_skipped: usize) {
        self.total += records.len() + terminated_skipped;
        for record in records {
            if record.is_null(TERMINATION_COLUMN) {
                self.active += 1;
            }
            if !record.is_null("latitude") && !record.is_null("longitude") {
                self.with_coordinates += 1;
            }
        }
    }

    /// Derives the terminated count and freezes the elapsed time.
    pub fn finish(&mut self) {
        self.terminated = self.total - self.active;
        self.processing_time = Some(self.started.elapsed());
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn terminated(&self) -> usize {
        self.terminated
    }

    pub fn with_coordinates(&self) -> usize {
        self.with_coordinates
    }

    pub fn files(&self) -> usize {
        self.files
    }

    pub fn processing_time(&self) -> Duration {
        self.processing_time
            .unwrap_or_else(|| self.started.elapsed())
    }

    /// Rows per second; zero when no measurable time has passed.
    pub fn throughput(&self) -> f64 {
        let seconds = self.processing_time().as_secs_f64();
        if seconds > 0.0 {
            self.total as f64 / seconds
        } else {
            0.0
        }
    }

    pub fn coverage_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.with_coordinates as f64 / self.total as f64 * 100.0
        }
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        vec![
            vec!["files processed".into(), self.files.to_string()],
            vec!["total postcodes".into(), self.total.to_string()],
            vec!["active postcodes".into(), self.active.to_string()],
            vec!["terminated postcodes".into(), self.terminated.to_string()],
            vec![
                "with coordinates".into(),
                format!(
                    "{} ({:.1}%)",
                    self.with_coordinates,
                    self.coverage_percent()
                ),
            ],
            vec![
                "processing time".into(),
                format!("{:.1}s", self.processing_time().as_secs_f64()),
            ],
            vec![
                "throughput".into(),
                format!("{:.0} postcodes/s", self.throughput()),
            ],
        ]
    }

    pub fn log_summary(&self) {
        info!("Processing complete!");
        info!("  Total postcodes processed: {}", self.total);
        info!("  Active postcodes: {}", self.active);
        info!("  Terminated postcodes: {}", self.terminated);
        info!(
            "  With coordinates: {} ({:.1}%)",
            self.with_coordinates,
            self.coverage_percent()
        );
        info!(
            "  Processing time: {:.1} seconds",
            self.processing_time().as_secs_f64()
        );
        info!(
            "  Processing speed: {:.0} postcodes/second",
            self.throughput()
        );
    }
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    fn record(term: Option<&str>, lat: Option<f64>, long: Option<f64>) -> FlatRecord {
        let mut record = FlatRecord::new();
        record.set("postcode", Some(Value::from("AB1 2CD")));
        record.set(TERMINATION_COLUMN, term.map(Value::from));
        record.set("latitude", lat.map(Value::Float));
        record.set("longitude", long.map(Value::Float));
        record
    }

    #[test]
    fn counts_active_terminated_and_coordinates() {
        let mut stats = ProcessingStats::start();
        stats.record(
            &[
                record(None, Some(51.5), Some(-0.1)),
                record(Some(""), None, Some(-0.1)),
                record(Some("202001"), Some(51.5), Some(-0.1)),
            ],
            2,
        );
        stats.finish();

        assert_eq!(stats.total(), 5);
        assert_eq!(stats.active(), 2);
        assert_eq!(stats.terminated(), 3);
        assert_eq!(stats.with_coordinates(), 2);
        assert!((stats.coverage_percent() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_run_has_zero_rates() {
        let mut stats = ProcessingStats::start();
        stats.finish();
        assert_eq!(stats.total(), 0);
        assert_eq!(stats.coverage_percent(), 0.0);
        assert_eq!(stats.throughput(), 0.0);
    }

    #[test]
    fn record_file_counts_files() {
        let mut stats = ProcessingStats::start();
        let result = FileResult {
            records: vec![record(None, None, None)],
            terminated_skipped: 1,
            ..FileResult::default()
        };
        stats.record_file(&result);
        stats.record_file(&FileResult::default());
        stats.finish();
        assert_eq!(stats.files(), 2);
        assert_eq!(stats.total(), 2);
        assert_eq!(stats.terminated(), 1);
    }
}
