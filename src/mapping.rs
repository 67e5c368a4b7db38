//! Declarative field-mapping table.
//!
//! Each [`FieldMapping`] says which source column feeds which output column,
//! how to transform and type it, and which other source column must hold a
//! usable value for it to count at all. The table is plain data so it can be
//! listed, overridden from YAML, and tested without running the extractor.

use std::{collections::HashSet, fmt, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, ensure};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{ingest::POSTCODE_COLUMN, schema::CanonicalSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,
    Float,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "int"),
            FieldType::Float => write!(f, "float"),
        }
    }
}

/// Pure string rewrites applied before type coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    /// Drop every whitespace character (`"SW1A 1AA"` → `"SW1A1AA"`).
    RemoveWhitespace,
    /// Take the `index`th piece after splitting on `separator`. Yields null
    /// when the separator is absent or the piece does not exist.
    SplitPart { separator: String, index: usize },
    Uppercase,
    Lowercase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformError {
    pub transform: Transform,
    pub input: String,
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} could not be applied to '{}'", self.transform, self.input)
    }
}

impl std::error::Error for TransformError {}

impl Transform {
    pub fn apply(&self, value: &str) -> Result<Option<String>, TransformError> {
        match self {
            Transform::RemoveWhitespace => Ok(Some(
                value.chars().filter(|c| !c.is_whitespace()).collect(),
            )),
            Transform::SplitPart { separator, index } => {
                if separator.is_empty() {
                    return Err(TransformError {
                        transform: self.clone(),
                        input: value.to_string(),
                    });
                }
                if !value.contains(separator.as_str()) {
                    return Ok(None);
                }
                Ok(value
                    .split(separator.as_str())
                    .nth(*index)
                    .map(str::to_string))
            }
            Transform::Uppercase => Ok(Some(value.to_uppercase())),
            Transform::Lowercase => Ok(Some(value.to_lowercase())),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::RemoveWhitespace => write!(f, "remove_whitespace"),
            Transform::SplitPart { separator, index } => {
                write!(f, "split_part('{separator}', {index})")
            }
            Transform::Uppercase => write!(f, "uppercase"),
            Transform::Lowercase => write!(f, "lowercase"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub column: String,
    pub source: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,
}

impl FieldMapping {
    pub fn new(column: &str, source: &str) -> Self {
        Self {
            column: column.to_string(),
            source: source.to_ascii_lowercase(),
            field_type: None,
            transform: None,
            depends_on: None,
        }
    }

    pub fn typed(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn depends_on(mut self, source: &str) -> Self {
        self.depends_on = Some(source.to_ascii_lowercase());
        self
    }
}

/// Ordered, validated set of mappings used for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingTable {
    mappings: Vec<FieldMapping>,
}

impl MappingTable {
    pub fn new(mappings: Vec<FieldMapping>) -> Result<Self> {
        let table = Self { mappings };
        table.validate()?;
        Ok(table)
    }

    /// ONSPD layout (February 2024 onwards: `itl` replaces NUTS and `sicbl`
    /// replaces CCG, under their historical output names).
    pub fn onspd() -> Self {
        let split = |index| Transform::SplitPart {
            separator: " ".to_string(),
            index,
        };
        Self {
            mappings: vec![
                FieldMapping::new("postcode", "pcds"),
                FieldMapping::new("pc_compact", "pcds").transform(Transform::RemoveWhitespace),
                // A grid reference of 0 means "none", so the grid fields
                // depend on their own source cell.
                FieldMapping::new("eastings", "oseast1m")
                    .typed(FieldType::Int)
                    .depends_on("oseast1m"),
                FieldMapping::new("northings", "osnrth1m")
                    .typed(FieldType::Int)
                    .depends_on("osnrth1m"),
                FieldMapping::new("latitude", "lat")
                    .typed(FieldType::Float)
                    .depends_on("osnrth1m"),
                FieldMapping::new("longitude", "long")
                    .typed(FieldType::Float)
                    .depends_on("oseast1m"),
                FieldMapping::new("country_code", "ctry"),
                FieldMapping::new("nhs_ha_code", "oshlthau"),
                FieldMapping::new("admin_county_id", "oscty"),
                FieldMapping::new("admin_district_id", "oslaua"),
                FieldMapping::new("admin_ward_id", "osward"),
                FieldMapping::new("parish_id", "parish"),
                FieldMapping::new("quality", "osgrdind").typed(FieldType::Int),
                FieldMapping::new("constituency_id", "pcon"),
                FieldMapping::new("european_electoral_region_code", "eer"),
                FieldMapping::new("region_code", "rgn"),
                FieldMapping::new("primary_care_trust_code", "pct"),
                FieldMapping::new("lsoa_id", "lsoa11"),
                FieldMapping::new("msoa_id", "msoa11"),
                FieldMapping::new("nuts_id", "itl"),
                FieldMapping::new("incode", "pcds").transform(split(1)),
                FieldMapping::new("outcode", "pcds").transform(split(0)),
                FieldMapping::new("ced_id", "ced"),
                FieldMapping::new("ccg_id", "sicbl"),
                FieldMapping::new("date_of_introduction", "dointr"),
                FieldMapping::new("date_of_termination", "doterm"),
                FieldMapping::new("pfa_id", "pfa"),
            ],
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening mapping file {path:?}"))?;
        let mut mappings: Vec<FieldMapping> = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing mapping file {path:?}"))?;
        for mapping in &mut mappings {
            mapping.source = mapping.source.trim().to_ascii_lowercase();
            if let Some(dep) = mapping.depends_on.as_mut() {
                *dep = dep.trim().to_ascii_lowercase();
            }
        }
        let table = Self::new(mappings).with_context(|| format!("Validating {path:?}"))?;
        info!("Loaded {} field mapping(s) from {path:?}", table.len());
        Ok(table)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.mappings).context("Serializing field mappings")
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.mappings.is_empty(), "Field mapping table is empty");
        let mut seen = HashSet::new();
        for mapping in &self.mappings {
            ensure!(
                !mapping.column.trim().is_empty(),
                "Field mapping for source '{}' has an empty column name",
                mapping.source
            );
            ensure!(
                !mapping.source.trim().is_empty(),
                "Field mapping '{}' has an empty source code",
                mapping.column
            );
            ensure!(
                seen.insert(mapping.column.as_str()),
                "Duplicate target column '{}' in field mappings",
                mapping.column
            );
        }
        ensure!(
            seen.contains(POSTCODE_COLUMN),
            "Field mappings must produce a '{POSTCODE_COLUMN}' column"
        );
        Ok(())
    }

    /// Logs every source or dependency code the canonical schema does not
    /// declare and returns them.
    pub fn undeclared_codes(&self, schema: &CanonicalSchema) -> Vec<String> {
        let mut missing = Vec::new();
        for mapping in &self.mappings {
            let codes = std::iter::once(&mapping.source).chain(mapping.depends_on.as_ref());
            for code in codes {
                if !schema.contains(code) && !missing.contains(code) {
                    warn!(
                        "Mapping '{}' refers to '{code}', which the ONSPD schema does not declare",
                        mapping.column
                    );
                    missing.push(code.clone());
                }
            }
        }
        missing
    }

    pub fn source_codes(&self) -> impl Iterator<Item = &str> {
        self.mappings.iter().map(|m| m.source.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldMapping> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

impl Default for MappingTable {
    fn default() -> Self {
        Self::onspd()
    }
}

impl<'a> IntoIterator for &'a MappingTable {
    type Item = &'a FieldMapping;
    type IntoIter = std::slice::Iter<'a, FieldMapping>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
