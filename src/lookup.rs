//! Auxiliary reference tables that turn coded ids into readable labels.
//!
//! Each table is a JSON file in one of three shapes:
//!
//! - a flat object of `code → "label"`;
//! - an object of `code → {...}` whose label is the entry's `name`, else its
//!   `value`, else the entry itself;
//! - an array of objects carrying a `code` member, labelled by `name` then
//!   `value`, where the first entry for a code wins.
//!
//! Shapes are normalised once at load time into a single code → label map so
//! per-row enrichment is a hash lookup.

use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use log::{info, warn};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::{record::Value, report::RunReport};

/// Table names published alongside the ONSPD, each stored as `<name>.json`.
pub const STANDARD_TABLES: &[&str] = &[
    "countries",
    "districts",
    "constituencies",
    "counties",
    "wards",
    "nhsHa",
    "regions",
    "european_registers",
    "pcts",
    "ccgs",
    "lsoa",
    "msoa",
    "nuts",
    "parishes",
    "police_force_areas",
    "ceds",
];

#[derive(Debug, Error)]
pub enum LookupLoadError {
    #[error("lookup table not found: {path:?}")]
    Missing { path: PathBuf },
    #[error("failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTable {
    Map(serde_json::Map<String, JsonValue>),
    List(Vec<JsonValue>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupTable {
    labels: HashMap<String, Value>,
}

impl LookupTable {
    pub fn from_json(json: JsonValue) -> Result<Self, serde_json::Error> {
        let raw: RawTable = serde_json::from_value(json)?;
        Ok(Self::from_raw(raw))
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let labels = pairs
            .into_iter()
            .map(|(code, label)| (code.into(), Value::String(label.into())))
            .collect();
        Self { labels }
    }

    fn from_raw(raw: RawTable) -> Self {
        let mut labels = HashMap::new();
        match raw {
            RawTable::Map(entries) => {
                for (code, entry) in entries {
                    let label = match entry {
                        JsonValue::Object(ref object) => object
                            .get("name")
                            .or_else(|| object.get("value"))
                            .map(|inner| json_to_value(inner.clone()))
                            .unwrap_or_else(|| Some(Value::Json(entry.clone()))),
                        other => json_to_value(other),
                    };
                    if let Some(label) = label {
                        labels.insert(code, label);
                    }
                }
            }
            RawTable::List(items) => {
                let mut seen = HashSet::new();
                for item in items {
                    let JsonValue::Object(object) = item else {
                        continue;
                    };
                    let Some(code) = object.get("code").and_then(code_key) else {
                        continue;
                    };
                    if !seen.insert(code.clone()) {
                        continue;
                    }
                    let label = object
                        .get("name")
                        .or_else(|| object.get("value"))
                        .cloned()
                        .and_then(json_to_value);
                    if let Some(label) = label {
                        labels.insert(code, label);
                    }
                }
            }
        }
        Self { labels }
    }

    pub fn load(path: &Path) -> Result<Self, LookupLoadError> {
        if !path.exists() {
            return Err(LookupLoadError::Missing {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path).map_err(|source| LookupLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawTable =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| {
                LookupLoadError::Parse {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
        Ok(Self::from_raw(raw))
    }

    pub fn resolve(&self, code: &str) -> Option<&Value> {
        self.labels.get(code)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn code_key(code: &JsonValue) -> Option<String> {
    match code {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_to_value(json: JsonValue) -> Option<Value> {
    match json {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(Value::String(s)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Integer(i)),
            None => n.as_f64().map(Value::Float),
        },
        other => Some(Value::Json(other)),
    }
}

/// All reference tables available to a run, keyed by table name.
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    tables: HashMap<String, LookupTable>,
}

impl LookupTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `<name>.json` from `dir` for every name given. Missing or
    /// unreadable tables are logged, tallied in `report`, and left out.
    pub fn load_dir(dir: &Path, names: &[&str], report: &mut RunReport) -> Self {
        let mut tables = HashMap::new();
        for name in names {
            let path = dir.join(format!("{name}.json"));
            match LookupTable::load(&path) {
                Ok(table) => {
                    info!("Loaded lookup table: {name}.json ({} entries)", table.len());
                    tables.insert((*name).to_string(), table);
                }
                Err(err @ LookupLoadError::Missing { .. }) => {
                    warn!("{err}");
                    report.missing_tables.push((*name).to_string());
                }
                Err(err) => {
                    warn!("Failed to load {name}.json: {:#}", anyhow::Error::from(err));
                    report.failed_tables.push((*name).to_string());
                }
            }
        }
        Self { tables }
    }

    pub fn insert(&mut self, name: impl Into<String>, table: LookupTable) {
        self.tables.insert(name.into(), table);
    }

    pub fn get(&self, name: &str) -> Option<&LookupTable> {
        self.tables.get(name)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn flat_map_resolves_directly() {
        let table = LookupTable::from_json(json!({"E92000001": "England"})).unwrap();
        assert_eq!(table.resolve("E92000001"), Some(&Value::from("England")));
        assert_eq!(table.resolve("W92000004"), None);
    }

    #[test]
    fn nested_map_prefers_name_then_value_then_object() {
        let table = LookupTable::from_json(json!({
            "A": {"name": "Alpha", "value": "ignored"},
            "B": {"value": "Beta"},
            "C": {"code": "C", "welsh": "Ceta"},
        }))
        .unwrap();
        assert_eq!(table.resolve("A"), Some(&Value::from("Alpha")));
        assert_eq!(table.resolve("B"), Some(&Value::from("Beta")));
        assert_eq!(
            table.resolve("C"),
            Some(&Value::Json(json!({"code": "C", "welsh": "Ceta"})))
        );
    }

    #[test]
    fn list_matches_first_code() {
        let table = LookupTable::from_json(json!([
            {"code": "E06000001", "name": "Hartlepool"},
            {"code": "E06000001", "name": "Duplicate"},
            {"code": "E06000002", "value": "Middlesbrough"},
            {"code": "E06000003"},
            "stray",
        ]))
        .unwrap();
        assert_eq!(table.resolve("E06000001"), Some(&Value::from("Hartlepool")));
        assert_eq!(table.resolve("E06000002"), Some(&Value::from("Middlesbrough")));
        assert_eq!(table.resolve("E06000003"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn load_dir_skips_missing_and_corrupt_tables() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("countries.json"), r#"{"E92000001":"England"}"#).unwrap();
        std::fs::write(dir.path().join("regions.json"), "{broken").unwrap();

        let mut report = RunReport::default();
        let tables =
            LookupTables::load_dir(dir.path(), &["countries", "regions", "wards"], &mut report);

        assert_eq!(tables.len(), 1);
        assert!(tables.get("countries").is_some());
        assert_eq!(report.failed_tables, vec!["regions".to_string()]);
        assert_eq!(report.missing_tables, vec!["wards".to_string()]);
    }
}
