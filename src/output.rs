//! Serialization of the assembled dataset.
//!
//! `annotated` output is a `#` comment block with the summary followed by
//! `ENHANCED_POSTCODE_DATA = ` and the structure as an indented Python
//! literal, so the file can be imported as a module. `json` output
//! is a single object with `metadata` and `postcodes` members. Counts always
//! come from the same [`Dataset`] that supplies the body.

use std::{
    io::{self, Write},
    path::Path,
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{assemble::Dataset, assemble::EnhancedPostcodeEntry, io_utils};

pub const ATTRIBUTION: &str = "Based on postcodes.io extraction logic (MIT License)";
pub const SOURCE: &str = "ONS Postcode Directory";
pub const DATA_BINDING: &str = "ENHANCED_POSTCODE_DATA";

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Annotated,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Annotated => "py",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputMetadata {
    pub generated_at: String,
    pub attribution: String,
    pub source: String,
    pub total_active_postcodes: usize,
    pub duplicate_postcode_keys: usize,
}

impl OutputMetadata {
    pub fn for_dataset(dataset: &Dataset, generated_at: impl Into<String>) -> Self {
        Self {
            generated_at: generated_at.into(),
            attribution: ATTRIBUTION.to_string(),
            source: SOURCE.to_string(),
            total_active_postcodes: dataset.len(),
            duplicate_postcode_keys: dataset.duplicate_keys,
        }
    }
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    metadata: &'a OutputMetadata,
    postcodes: &'a std::collections::BTreeMap<String, EnhancedPostcodeEntry>,
}

pub fn write_dataset<W: Write>(
    mut writer: W,
    dataset: &Dataset,
    metadata: &OutputMetadata,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Annotated => {
            writeln!(writer, "# Enhanced UK Postcodes Dataset")?;
            writeln!(writer, "# Generated on {}", metadata.generated_at)?;
            writeln!(writer, "# {}", metadata.attribution)?;
            writeln!(
                writer,
                "# Total active postcodes: {}",
                metadata.total_active_postcodes
            )?;
            writeln!(
                writer,
                "# Duplicate postcode keys replaced: {}",
                metadata.duplicate_postcode_keys
            )?;
            writeln!(writer, "# Source: {}", metadata.source)?;
            writeln!(writer)?;
            write!(writer, "{DATA_BINDING} = ")?;
            let body =
                serde_json::to_value(&dataset.entries).context("Serializing postcode entries")?;
            write_python_literal(&mut writer, &body, 0)?;
            writeln!(writer)?;
        }
        OutputFormat::Json => {
            let document = JsonDocument {
                metadata,
                postcodes: &dataset.entries,
            };
            serde_json::to_writer_pretty(&mut writer, &document)
                .context("Serializing postcode dataset")?;
            writeln!(writer)?;
        }
    }
    writer.flush().context("Flushing dataset output")?;
    Ok(())
}

/// Writes `value` as a Python literal: `None`/`True`/`False` for the JSON
/// keywords, double-quoted strings, four-space indentation.
fn write_python_literal<W: Write>(
    writer: &mut W,
    value: &JsonValue,
    depth: usize,
) -> io::Result<()> {
    let pad = "    ".repeat(depth + 1);
    match value {
        JsonValue::Null => write!(writer, "None"),
        JsonValue::Bool(true) => write!(writer, "True"),
        JsonValue::Bool(false) => write!(writer, "False"),
        JsonValue::Number(number) => write!(writer, "{number}"),
        JsonValue::String(text) => write!(writer, "{}", JsonValue::from(text.as_str())),
        JsonValue::Array(items) if items.is_empty() => write!(writer, "[]"),
        JsonValue::Object(entries) if entries.is_empty() => write!(writer, "{{}}"),
        JsonValue::Array(items) => {
            writeln!(writer, "[")?;
            for item in items {
                write!(writer, "{pad}")?;
                write_python_literal(writer, item, depth + 1)?;
                writeln!(writer, ",")?;
            }
            write!(writer, "{}]", "    ".repeat(depth))
        }
        JsonValue::Object(entries) => {
            writeln!(writer, "{{")?;
            for (key, item) in entries {
                write!(writer, "{pad}{}: ", JsonValue::from(key.as_str()))?;
                write_python_literal(writer, item, depth + 1)?;
                writeln!(writer, ",")?;
            }
            write!(writer, "{}}}", "    ".repeat(depth))
        }
    }
}

pub fn write_dataset_to_path(
    path: &Path,
    dataset: &Dataset,
    metadata: &OutputMetadata,
    format: OutputFormat,
) -> Result<()> {
    let writer = io_utils::create_output(path)?;
    write_dataset(writer, dataset, metadata, format)
        .with_context(|| format!("Writing enhanced dataset to {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assemble::assemble, record::FlatRecord, record::Value};

    fn dataset() -> Dataset {
        let mut record = FlatRecord::new();
        record.set("postcode", Some(Value::from("SW1A 1AA")));
        record.set("date_of_termination", None);
        record.set("eastings", Some(Value::Integer(529090)));
        assemble(&[record])
    }

    #[test]
    fn annotated_output_leads_with_summary() {
        let dataset = dataset();
        let metadata = OutputMetadata::for_dataset(&dataset, "2024-02-01 00:00:00");
        let mut buffer = Vec::new();
        write_dataset(&mut buffer, &dataset, &metadata, OutputFormat::Annotated).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.starts_with("# Enhanced UK Postcodes Dataset\n"));
        assert!(text.contains("# Total active postcodes: 1\n"));
        let body = text.split_once("ENHANCED_POSTCODE_DATA = ").unwrap().1;
        assert!(body.starts_with("{\n    \"SW1A 1AA\": {\n"));
        assert!(body.contains("\"eastings\": 529090,"));
        assert!(body.contains("\"latitude\": None,"));
        assert!(!body.contains("null"));
        assert!(body.ends_with("}\n"));
    }

    #[test]
    fn python_literal_maps_json_keywords_and_escapes_strings() {
        let value = serde_json::json!({
            "flag": true,
            "off": false,
            "list": [1, 2.5, null],
            "empty": {},
            "quoted": "St. John's \"Wood\"",
        });
        let mut buffer = Vec::new();
        write_python_literal(&mut buffer, &value, 0).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("\"flag\": True,"));
        assert!(text.contains("\"off\": False,"));
        assert!(text.contains("\"list\": [\n        1,\n        2.5,\n        None,\n    ],"));
        assert!(text.contains("\"empty\": {},"));
        assert!(text.contains(r#""quoted": "St. John's \"Wood\"","#));
    }

    #[test]
    fn json_output_has_metadata_and_postcodes() {
        let dataset = dataset();
        let metadata = OutputMetadata::for_dataset(&dataset, "now");
        let mut buffer = Vec::new();
        write_dataset(&mut buffer, &dataset, &metadata, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(parsed["metadata"]["total_active_postcodes"], 1);
        assert_eq!(parsed["metadata"]["source"], SOURCE);
        assert!(parsed["postcodes"]["SW1A 1AA"].is_object());
    }
}
