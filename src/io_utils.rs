//! CSV reader construction, delimiter and encoding resolution, and output
//! file creation shared by every stage that touches the filesystem.
//!
//! ONSPD extracts are comma separated and UTF-8 by default; both can be
//! overridden from the command line. Readers are configured `flexible` so a
//! short or long row is still handed to the extractor, which resolves cells
//! by header position and treats out-of-range cells as absent.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use itertools::Itertools;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(
    path: &Path,
    delimiter: u8,
) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    Ok(open_csv_reader(BufReader::new(file), delimiter))
}

pub fn create_output(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Creating output directory {parent:?}"))?;
    }
    let file = File::create(path).with_context(|| format!("Creating output file {path:?}"))?;
    Ok(BufWriter::new(file))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    if encoding == UTF_8 {
        return std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|err| anyhow!("Invalid UTF-8 in field: {err}"));
    }
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader.byte_headers()?.clone();
    decode_record(&headers, encoding)
}

/// Lists `*.csv` files directly inside `dir`, sorted by file name so that
/// cross-file ordering is reproducible.
pub fn discover_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(anyhow!("CSV directory not found: {dir:?}"));
    }
    let entries = std::fs::read_dir(dir).with_context(|| format!("Listing {dir:?}"))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.with_context(|| format!("Listing {dir:?}"))?.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    Ok(files
        .into_iter()
        .sorted_by(|a, b| a.file_name().cmp(&b.file_name()))
        .collect())
}

pub fn file_size_mb(path: &Path) -> Result<f64> {
    let metadata =
        std::fs::metadata(path).with_context(|| format!("Reading metadata for {path:?}"))?;
    Ok(metadata.len() as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_follows_extension() {
        assert_eq!(resolve_input_delimiter(Path::new("a.tsv"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("a.CSV"), None), b',');
        assert_eq!(resolve_input_delimiter(Path::new("a.tsv"), Some(b';')), b';');
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        assert!(resolve_encoding(Some("not-an-encoding")).is_err());
        assert_eq!(resolve_encoding(None).unwrap(), UTF_8);
        assert_eq!(
            resolve_encoding(Some("latin1")).unwrap().name(),
            "windows-1252"
        );
    }

    #[test]
    fn discovery_is_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.csv", "a.CSV", "notes.txt", "c.csv"] {
            std::fs::write(dir.path().join(name), "pcds\n").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let files = discover_csv_files(dir.path()).unwrap();
        let names = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a.CSV", "b.csv", "c.csv"]);
    }

    #[test]
    fn discovery_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_csv_files(&dir.path().join("missing")).is_err());
    }
}
