//! Canonical ONSPD column schema.
//!
//! The schema file is a JSON array of column descriptors in their published
//! order, e.g. `[{"code": "pcd", "name": "Unit postcode"}, ...]`. Only the
//! `code` member is required. The resulting code → position map documents the
//! canonical layout the field-mapping table refers to; individual source files
//! are still read through their own header map.

use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures that abort a run before any data is read.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("ONSPD schema not found at {path:?}")]
    NotFound { path: PathBuf },
    #[error("Failed to read ONSPD schema {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse ONSPD schema {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("ONSPD schema {path:?} does not declare any columns")]
    Empty { path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaColumn {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSchema {
    columns: Vec<SchemaColumn>,
    index: HashMap<String, usize>,
}

impl CanonicalSchema {
    pub fn from_columns(columns: Vec<SchemaColumn>) -> Self {
        let mut index = HashMap::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            // First declaration wins if a code is repeated.
            index
                .entry(column.code.trim().to_ascii_lowercase())
                .or_insert(position);
        }
        Self { columns, index }
    }

    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        if !path.exists() {
            return Err(SchemaError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let columns: Vec<SchemaColumn> = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| SchemaError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        let schema = Self::from_columns(columns);
        if schema.is_empty() {
            return Err(SchemaError::Empty {
                path: path.to_path_buf(),
            });
        }
        info!("Loaded ONSPD schema with {} columns", schema.len());
        Ok(schema)
    }

    pub fn index_of(&self, code: &str) -> Option<usize> {
        self.index.get(&code.to_ascii_lowercase()).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index_of(code).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
