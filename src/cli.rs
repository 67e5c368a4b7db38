use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{ingest::DEFAULT_CHUNK_SIZE, output::OutputFormat};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Build an enriched per-postcode dataset from ONS Postcode Directory extracts",
    long_about = None
)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Process every CSV file in an ONSPD multi_csv directory and write the dataset
    Build(BuildArgs),
    /// Process a single ONSPD CSV file and report statistics
    Process(ProcessArgs),
    /// List the field mappings used to extract source columns
    Mappings(MappingsArgs),
}

/// Inputs shared by every command that reads ONSPD data.
#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Directory holding `schemas/onspd_schema.json` and `lookup_tables/*.json`
    #[arg(long = "data-dir", default_value = "data")]
    pub data_dir: PathBuf,
    /// Canonical schema file (defaults to <data-dir>/schemas/onspd_schema.json)
    #[arg(long)]
    pub schema: Option<PathBuf>,
    /// Lookup table directory (defaults to <data-dir>/lookup_tables)
    #[arg(long = "lookup-dir")]
    pub lookup_dir: Option<PathBuf>,
    /// YAML file replacing the built-in field mappings
    #[arg(long)]
    pub mappings: Option<PathBuf>,
    /// Number of rows held in memory per chunk
    #[arg(long = "chunk-size", default_value_t = DEFAULT_CHUNK_SIZE, value_parser = parse_chunk_size)]
    pub chunk_size: usize,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

impl SourceArgs {
    pub fn schema_path(&self) -> PathBuf {
        self.schema
            .clone()
            .unwrap_or_else(|| self.data_dir.join("schemas").join("onspd_schema.json"))
    }

    pub fn lookup_path(&self) -> PathBuf {
        self.lookup_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("lookup_tables"))
    }
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Path to the ONSPD multi_csv directory
    pub input_dir: PathBuf,
    /// Output file (defaults to enhanced_postcodes_<YYYY_MM>.<ext>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Output representation
    #[arg(long, value_enum, default_value = "annotated")]
    pub format: OutputFormat,
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Path to a single ONSPD CSV file
    pub input: PathBuf,
    /// Also write the assembled dataset to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Output representation
    #[arg(long, value_enum, default_value = "annotated")]
    pub format: OutputFormat,
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args)]
pub struct MappingsArgs {
    /// YAML file replacing the built-in field mappings
    #[arg(long)]
    pub mappings: Option<PathBuf>,
    /// Print the table as YAML (suitable for --mappings) instead of text
    #[arg(long)]
    pub yaml: bool,
}

pub fn parse_chunk_size(value: &str) -> Result<usize, String> {
    let parsed: usize = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a valid chunk size"))?;
    if parsed == 0 {
        return Err("Chunk size must be at least 1".to_string());
    }
    Ok(parsed)
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
