#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use onspd_enrich::generate::ProcessorConfig;
use tempfile::{TempDir, tempdir};

/// Column layout used by the synthetic extracts, a reordered subset of the
/// published ONSPD columns.
pub const ONSPD_HEADER: &[&str] = &[
    "pcd", "pcds", "dointr", "doterm", "oscty", "ced", "oslaua", "osward", "parish", "oseast1m",
    "osnrth1m", "osgrdind", "oshlthau", "ctry", "rgn", "pcon", "eer", "pct", "itl", "lsoa11",
    "msoa11", "sicbl", "lat", "long", "pfa",
];

/// Canonical order declared by the schema file; deliberately differs from
/// [`ONSPD_HEADER`].
pub const SCHEMA_CODES: &[&str] = &[
    "pcd", "pcd2", "pcds", "dointr", "doterm", "oscty", "ced", "oslaua", "osward", "parish",
    "usertype", "oseast1m", "osnrth1m", "osgrdind", "oshlthau", "nhser", "ctry", "rgn", "pcon",
    "eer", "pct", "itl", "lsoa11", "msoa11", "sicbl", "lat", "long", "pfa",
];

/// One synthetic source row, addressed by ONSPD code.
#[derive(Debug, Clone)]
pub struct OnspdRow {
    cells: BTreeMap<&'static str, String>,
}

impl OnspdRow {
    /// An active Westminster postcode with a valid grid reference.
    pub fn active(postcode: &str) -> Self {
        let mut cells = BTreeMap::new();
        cells.insert("pcd", postcode.replace(' ', ""));
        cells.insert("pcds", postcode.to_string());
        cells.insert("dointr", "198001".to_string());
        cells.insert("oseast1m", "529090".to_string());
        cells.insert("osnrth1m", "179645".to_string());
        cells.insert("osgrdind", "1".to_string());
        cells.insert("ctry", "E92000001".to_string());
        cells.insert("oslaua", "E09000033".to_string());
        cells.insert("sicbl", "E38000031".to_string());
        cells.insert("lat", "51.501009".to_string());
        cells.insert("long", "-0.141588".to_string());
        Self { cells }
    }

    pub fn set(mut self, code: &'static str, value: &str) -> Self {
        self.cells.insert(code, value.to_string());
        self
    }

    pub fn line(&self, header: &[&str]) -> String {
        header
            .iter()
            .map(|code| self.cells.get(code).cloned().unwrap_or_default())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` under the workspace, creating parent directories.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Creates `data/schemas/onspd_schema.json` and, when asked, a set of
    /// lookup tables covering all three table shapes.
    pub fn data_dir(&self, with_tables: bool) -> PathBuf {
        let schema = SCHEMA_CODES
            .iter()
            .map(|code| format!(r#"{{"code":"{code}"}}"#))
            .collect::<Vec<_>>()
            .join(",");
        self.write("data/schemas/onspd_schema.json", &format!("[{schema}]"));
        fs::create_dir_all(self.path().join("data/lookup_tables")).expect("lookup dir");
        if with_tables {
            self.write(
                "data/lookup_tables/countries.json",
                r#"{"E92000001": "England", "W92000004": "Wales"}"#,
            );
            self.write(
                "data/lookup_tables/districts.json",
                r#"{"E09000033": {"name": "Westminster"}, "E09000001": {"value": "City of London"}}"#,
            );
            self.write(
                "data/lookup_tables/ccgs.json",
                r#"[{"code": "E38000031", "name": "NHS North West London", "code2": "W2U3Z"}]"#,
            );
        }
        self.path().join("data")
    }

    /// Writes one extract under `multi_csv/` using [`ONSPD_HEADER`].
    pub fn extract(&self, name: &str, rows: &[OnspdRow]) -> PathBuf {
        self.extract_with_header(name, ONSPD_HEADER, rows)
    }

    pub fn extract_with_header(&self, name: &str, header: &[&str], rows: &[OnspdRow]) -> PathBuf {
        let mut body = header.join(",");
        body.push('\n');
        for row in rows {
            body.push_str(&row.line(header));
            body.push('\n');
        }
        self.write(&format!("multi_csv/{name}"), &body)
    }

    pub fn multi_csv(&self) -> PathBuf {
        self.path().join("multi_csv")
    }

    pub fn config(&self, data_dir: &Path, chunk_size: usize) -> ProcessorConfig {
        let mut config = ProcessorConfig::from_data_dir(data_dir);
        config.options.chunk_size = chunk_size;
        config
    }
}
