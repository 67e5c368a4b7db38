//! End-to-end runs: load the schema, mappings and lookup tables, ingest one
//! file or a whole directory, assemble the active dataset and write it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use log::{info, warn};

use crate::{
    assemble::{Dataset, assemble},
    cli::{BuildArgs, ProcessArgs, SourceArgs},
    ingest::{IngestOptions, Pipeline},
    io_utils,
    lookup::{LookupTables, STANDARD_TABLES},
    mapping::MappingTable,
    output::{self, OutputFormat, OutputMetadata},
    record::FlatRecord,
    report::RunReport,
    schema::CanonicalSchema,
    stats::ProcessingStats,
    table,
};

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub schema_path: PathBuf,
    pub lookup_dir: PathBuf,
    pub mappings_path: Option<PathBuf>,
    pub options: IngestOptions,
}

impl ProcessorConfig {
    pub fn from_data_dir(data_dir: &Path) -> Self {
        Self {
            schema_path: data_dir.join("schemas").join("onspd_schema.json"),
            lookup_dir: data_dir.join("lookup_tables"),
            mappings_path: None,
            options: IngestOptions::default(),
        }
    }

    pub fn from_args(args: &SourceArgs) -> Result<Self> {
        Ok(Self {
            schema_path: args.schema_path(),
            lookup_dir: args.lookup_path(),
            mappings_path: args.mappings.clone(),
            options: IngestOptions {
                chunk_size: args.chunk_size,
                delimiter: args.delimiter,
                encoding: io_utils::resolve_encoding(args.input_encoding.as_deref())?,
            },
        })
    }
}

#[derive(Debug)]
pub struct RunOutput {
    pub records: Vec<FlatRecord>,
    pub stats: ProcessingStats,
}

/// Holds everything loaded once per run.
#[derive(Debug)]
pub struct Processor {
    mappings: MappingTable,
    lookups: LookupTables,
    options: IngestOptions,
    report: RunReport,
}

impl Processor {
    /// Fails only when the canonical schema or an explicit mapping file
    /// cannot be loaded; lookup tables degrade individually.
    pub fn load(config: &ProcessorConfig) -> Result<Self> {
        let schema = CanonicalSchema::load(&config.schema_path)?;
        let mappings = match &config.mappings_path {
            Some(path) => MappingTable::load(path)?,
            None => MappingTable::onspd(),
        };
        mappings.undeclared_codes(&schema);
        let mut report = RunReport::default();
        let lookups = LookupTables::load_dir(&config.lookup_dir, STANDARD_TABLES, &mut report);
        if lookups.is_empty() {
            warn!(
                "No lookup tables loaded from {:?}; output will carry codes only",
                config.lookup_dir
            );
        } else {
            info!(
                "Initialized processor with {} lookup tables",
                lookups.len()
            );
        }
        Ok(Self {
            mappings,
            lookups,
            options: config.options,
            report,
        })
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn process_directory(&mut self, dir: &Path) -> Result<RunOutput> {
        let pipeline = Pipeline::new(&self.mappings, &self.lookups, self.options)?;
        let mut stats = ProcessingStats::start();
        let records = pipeline.process_directory(dir, &mut stats, &mut self.report)?;
        stats.finish();
        Ok(RunOutput { records, stats })
    }

    pub fn process_file(&mut self, path: &Path) -> Result<RunOutput> {
        let pipeline = Pipeline::new(&self.mappings, &self.lookups, self.options)?;
        let mut stats = ProcessingStats::start();
        let records = pipeline.process_single(path, &mut stats, &mut self.report)?;
        stats.finish();
        Ok(RunOutput { records, stats })
    }

    /// Assembles the active dataset and records duplicate keys in the report.
    pub fn assemble(&mut self, records: &[FlatRecord]) -> Dataset {
        info!("Filtering active postcodes...");
        let dataset = assemble(records);
        self.report.duplicate_postcodes += dataset.duplicate_keys;
        dataset
    }
}

pub fn default_output_path(format: OutputFormat) -> PathBuf {
    let stamp = Local::now().format("%Y_%m");
    PathBuf::from(format!("enhanced_postcodes_{stamp}.{}", format.extension()))
}

pub fn execute_build(args: &BuildArgs) -> Result<()> {
    info!("Starting enhanced postcode dataset generation...");
    let config = ProcessorConfig::from_args(&args.source)?;
    let mut processor = Processor::load(&config)?;
    let run = processor
        .process_directory(&args.input_dir)
        .with_context(|| format!("Processing {:?}", args.input_dir))?;
    run.stats.log_summary();

    let dataset = processor.assemble(&run.records);
    if dataset.is_empty() {
        warn!("No active postcodes were produced; writing an empty dataset");
    }
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(args.format));
    write_output(&output_path, &dataset, args.format)?;
    print_summary(&run.stats, processor.report());
    Ok(())
}

pub fn execute_process(args: &ProcessArgs) -> Result<()> {
    let config = ProcessorConfig::from_args(&args.source)?;
    let mut processor = Processor::load(&config)?;
    let run = processor
        .process_file(&args.input)
        .with_context(|| format!("Processing {:?}", args.input))?;
    run.stats.log_summary();

    let dataset = processor.assemble(&run.records);
    if let Some(path) = &args.output {
        write_output(path, &dataset, args.format)?;
    }
    print_summary(&run.stats, processor.report());
    Ok(())
}

fn write_output(path: &Path, dataset: &Dataset, format: OutputFormat) -> Result<()> {
    info!("Writing enhanced dataset to {path:?}...");
    let generated_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let metadata = OutputMetadata::for_dataset(dataset, generated_at);
    output::write_dataset_to_path(path, dataset, &metadata, format)?;
    info!("Enhanced dataset generated successfully!");
    info!("  Output file: {path:?}");
    info!("  File size: {:.1} MB", io_utils::file_size_mb(path)?);
    info!("  Postcodes: {}", dataset.len());
    Ok(())
}

fn print_summary(stats: &ProcessingStats, report: &RunReport) {
    report.log_summary();
    let headers = vec!["metric".to_string(), "value".to_string()];
    let mut rows = stats.rows();
    if report.has_degradations() {
        rows.extend(report.rows());
    }
    table::print_table(&headers, &rows);
}
