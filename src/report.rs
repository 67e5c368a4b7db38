//! Per-run diagnostics collector.
//!
//! A [`RunReport`] is created by the caller, threaded through loading and
//! ingestion by `&mut`, and rendered once the run is over. It only tallies
//! degraded or skipped events; throughput and row totals live in
//! [`crate::stats::ProcessingStats`].

use std::path::PathBuf;

use log::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub missing_tables: Vec<String>,
    pub failed_tables: Vec<String>,
    pub failed_files: Vec<PathBuf>,
    pub empty_files: Vec<PathBuf>,
    pub header_rows_skipped: usize,
    pub terminated_skipped: usize,
    pub rows_without_postcode: usize,
    pub transform_failures: usize,
    pub coercion_failures: usize,
    pub duplicate_postcodes: usize,
}

impl RunReport {
    pub fn has_degradations(&self) -> bool {
        !self.missing_tables.is_empty()
            || !self.failed_tables.is_empty()
            || !self.failed_files.is_empty()
            || self.transform_failures > 0
            || self.coercion_failures > 0
            || self.duplicate_postcodes > 0
    }

    /// Folds the row-level counters of one file into the run totals.
    pub fn absorb(&mut self, file: RunReport) {
        self.missing_tables.extend(file.missing_tables);
        self.failed_tables.extend(file.failed_tables);
        self.failed_files.extend(file.failed_files);
        self.empty_files.extend(file.empty_files);
        self.header_rows_skipped += file.header_rows_skipped;
        self.terminated_skipped += file.terminated_skipped;
        self.rows_without_postcode += file.rows_without_postcode;
        self.transform_failures += file.transform_failures;
        self.coercion_failures += file.coercion_failures;
        self.duplicate_postcodes += file.duplicate_postcodes;
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        vec![
            vec![
                "missing lookup tables".to_string(),
                self.missing_tables.len().to_string(),
            ],
            vec![
                "unreadable lookup tables".to_string(),
                self.failed_tables.len().to_string(),
            ],
            vec![
                "failed source files".to_string(),
                self.failed_files.len().to_string(),
            ],
            vec![
                "source files without rows".to_string(),
                self.empty_files.len().to_string(),
            ],
            vec![
                "terminated rows skipped".to_string(),
                self.terminated_skipped.to_string(),
            ],
            vec![
                "embedded header rows skipped".to_string(),
                self.header_rows_skipped.to_string(),
            ],
            vec![
                "rows without postcode".to_string(),
                self.rows_without_postcode.to_string(),
            ],
            vec![
                "transform failures".to_string(),
                self.transform_failures.to_string(),
            ],
            vec![
                "type coercion failures".to_string(),
                self.coercion_failures.to_string(),
            ],
            vec![
                "duplicate postcode keys".to_string(),
                self.duplicate_postcodes.to_string(),
            ],
        ]
    }

    pub fn log_summary(&self) {
        if !self.missing_tables.is_empty() {
            warn!(
                "Enrichment unavailable for missing tables: {}",
                self.missing_tables.join(", ")
            );
        }
        if !self.failed_tables.is_empty() {
            warn!(
                "Enrichment unavailable for unreadable tables: {}",
                self.failed_tables.join(", ")
            );
        }
        for path in &self.failed_files {
            warn!("Source file contributed no rows after an error: {path:?}");
        }
        if self.duplicate_postcodes > 0 {
            warn!(
                "{} postcode key(s) appeared more than once; later records replaced earlier ones",
                self.duplicate_postcodes
            );
        }
        info!(
            "Skipped {} terminated row(s), {} embedded header row(s), {} row(s) without postcode",
            self.terminated_skipped, self.header_rows_skipped, self.rows_without_postcode
        );
    }
}
