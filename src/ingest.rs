//! Chunked ingestion of ONSPD source files.
//!
//! A file is read row by row into bounded chunks; each chunk is filtered,
//! extracted and enriched before the next one is read, so peak memory tracks
//! the chunk size and not the file size. Per-file results are concatenated in
//! chunk order, and per-directory results in file-name order.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use encoding_rs::{Encoding, UTF_8};
use log::{debug, error, info, warn};

use crate::{
    enrich::Enricher,
    extract::{extract_record, read_cell},
    headers::HeaderMap,
    io_utils,
    lookup::LookupTables,
    mapping::MappingTable,
    record::FlatRecord,
    report::RunReport,
    stats::ProcessingStats,
};

pub const DEFAULT_CHUNK_SIZE: usize = 50_000;

/// Source column holding the termination date; any value marks the row inactive.
pub const TERMINATION_CODE: &str = "doterm";
/// Source column whose own name shows up again when a header row is embedded
/// mid-file.
pub const HEADER_GUARD_CODE: &str = "pcd";
/// Output column the assembler and aggregator use to tell active rows apart.
pub const TERMINATION_COLUMN: &str = "date_of_termination";
pub const POSTCODE_COLUMN: &str = "postcode";

const CHUNK_PROGRESS_INTERVAL: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub chunk_size: usize,
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileResult {
    pub path: PathBuf,
    pub records: Vec<FlatRecord>,
    pub rows_read: usize,
    pub terminated_skipped: usize,
    pub chunks: usize,
}

impl FileResult {
    fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            ..Self::default()
        }
    }
}

pub struct Pipeline<'a> {
    mappings: &'a MappingTable,
    enricher: Enricher<'a>,
    options: IngestOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        mappings: &'a MappingTable,
        lookups: &'a LookupTables,
        options: IngestOptions,
    ) -> Result<Self> {
        ensure!(options.chunk_size > 0, "Chunk size must be at least 1");
        Ok(Self {
            mappings,
            enricher: Enricher::new(lookups),
            options,
        })
    }

    /// Filters, extracts and enriches one chunk of decoded rows.
    pub fn process_chunk(
        &self,
        rows: &[Vec<String>],
        headers: &HeaderMap,
        report: &mut RunReport,
    ) -> Vec<FlatRecord> {
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            // Checked first so a repeated header is not tallied as terminated.
            if read_cell(row, headers, HEADER_GUARD_CODE)
                .is_some_and(|cell| cell.eq_ignore_ascii_case(HEADER_GUARD_CODE))
            {
                report.header_rows_skipped += 1;
                continue;
            }
            if read_cell(row, headers, TERMINATION_CODE).is_some() {
                report.terminated_skipped += 1;
                continue;
            }
            let mut record = extract_record(row, headers, self.mappings, report);
            self.enricher.enrich(&mut record);
            if record.is_null(POSTCODE_COLUMN) {
                report.rows_without_postcode += 1;
                continue;
            }
            records.push(record);
        }
        records
    }

    /// Processes one file, propagating I/O and CSV errors.
    pub fn process_file(&self, path: &Path, report: &mut RunReport) -> Result<FileResult> {
        ensure!(path.is_file(), "CSV file not found: {path:?}");
        debug!("Processing CSV: {path:?}");
        let delimiter = io_utils::resolve_input_delimiter(path, self.options.delimiter);
        let encoding = self.options.encoding;

        let headers = HeaderMap::read(path, delimiter, encoding)?;
        for code in self.mappings.source_codes() {
            if !headers.contains(code) {
                debug!("Column '{code}' is absent from {path:?}; mapped field will be null");
            }
        }

        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let mut result = FileResult::empty(path);
        let mut local = RunReport::default();
        let mut chunk: Vec<Vec<String>> = Vec::with_capacity(self.options.chunk_size);
        let mut record = csv::ByteRecord::new();

        loop {
            let more = reader
                .read_byte_record(&mut record)
                .with_context(|| format!("Reading row {} in {path:?}", result.rows_read + 2))?;
            if more {
                let decoded = io_utils::decode_record(&record, encoding)
                    .with_context(|| format!("Decoding row {} in {path:?}", result.rows_read + 2))?;
                chunk.push(decoded);
                result.rows_read += 1;
            }
            let flush = chunk.len() >= self.options.chunk_size || (!more && !chunk.is_empty());
            if flush {
                let processed = self.process_chunk(&chunk, &headers, &mut local);
                result.records.extend(processed);
                chunk.clear();
                result.chunks += 1;
                if result.chunks % CHUNK_PROGRESS_INTERVAL == 0 {
                    debug!("  Processed {} chunks from {path:?}", result.chunks);
                }
            }
            if !more {
                break;
            }
        }

        result.terminated_skipped = local.terminated_skipped;
        if result.records.is_empty() {
            warn!("No valid data found in {path:?}");
            local.empty_files.push(path.to_path_buf());
        } else {
            debug!(
                "  Extracted {} postcodes from {path:?}",
                result.records.len()
            );
        }
        report.absorb(local);
        Ok(result)
    }

    /// Like [`Pipeline::process_file`], but a failing file is logged and
    /// contributes no rows.
    pub fn process_file_tolerant(&self, path: &Path, report: &mut RunReport) -> FileResult {
        match self.process_file(path, report) {
            Ok(result) => result,
            Err(err) => {
                error!("Error processing {path:?}: {err:#}");
                report.failed_files.push(path.to_path_buf());
                FileResult::empty(path)
            }
        }
    }

    /// Processes every `*.csv` file in `dir`. Only a missing directory is an
    /// error; an empty directory yields no rows and a warning.
    pub fn process_directory(
        &self,
        dir: &Path,
        stats: &mut ProcessingStats,
        report: &mut RunReport,
    ) -> Result<Vec<FlatRecord>> {
        let files = io_utils::discover_csv_files(dir)?;
        if files.is_empty() {
            warn!("No CSV files found in {dir:?}");
            return Ok(Vec::new());
        }
        info!("Found {} CSV files to process", files.len());

        let mut records = Vec::new();
        for (idx, file) in files.iter().enumerate() {
            info!(
                "Processing file {}/{}: {}",
                idx + 1,
                files.len(),
                file.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.display().to_string())
            );
            let result = self.process_file_tolerant(file, report);
            stats.record_file(&result);
            records.extend(result.records);
        }
        if records.is_empty() {
            warn!("No data processed from any CSV files");
        }
        Ok(records)
    }

    /// Single-file entry point with the same accounting as a directory run.
    /// Only a path that does not exist is an error; an unreadable or
    /// malformed file contributes no rows.
    pub fn process_single(
        &self,
        path: &Path,
        stats: &mut ProcessingStats,
        report: &mut RunReport,
    ) -> Result<Vec<FlatRecord>> {
        ensure!(path.exists(), "CSV file not found: {path:?}");
        let result = self.process_file_tolerant(path, report);
        stats.record_file(&result);
        Ok(result.records)
    }
}
