//! Per-file header resolution.
//!
//! ONSPD extracts from different releases reorder and drop columns, so every
//! file is read through its own lowercase name → position map rather than the
//! canonical schema order.

use std::{collections::HashMap, path::Path};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::debug;

use crate::io_utils;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    index: HashMap<String, usize>,
}

impl HeaderMap {
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut index = HashMap::with_capacity(headers.len());
        for (position, name) in headers.iter().enumerate() {
            let normalized = name
                .as_ref()
                .trim()
                .trim_start_matches('\u{feff}')
                .to_lowercase();
            // A repeated column name resolves to its first occurrence.
            index.entry(normalized).or_insert(position);
        }
        Self { index }
    }

    /// Reads only the header line of `path`.
    pub fn read(path: &Path, delimiter: u8, encoding: &'static Encoding) -> Result<Self> {
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        let headers = io_utils::reader_headers(&mut reader, encoding)
            .with_context(|| format!("Reading header row of {path:?}"))?;
        let map = Self::from_headers(&headers);
        debug!("CSV columns found in {path:?}: {}", headers.join(", "));
        Ok(map)
    }

    pub fn get(&self, code: &str) -> Option<usize> {
        self.index.get(code).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
