//! Row → [`FlatRecord`] extraction driven by a [`MappingTable`].
//!
//! For every mapping in declaration order the extractor reads the source
//! cell through the file's [`HeaderMap`], applies the dependency rule, the
//! transform and the type coercion. No step can fail the row; a problem with
//! one field only nulls that field.

use log::debug;

use crate::{
    headers::HeaderMap,
    mapping::{FieldMapping, FieldType, MappingTable},
    record::{FlatRecord, Value},
    report::RunReport,
};

/// Reads `code` from `row`. Missing columns, out-of-range cells, blank cells
/// and the literal `nan` (any case) are all null.
pub fn read_cell<'r>(row: &'r [String], headers: &HeaderMap, code: &str) -> Option<&'r str> {
    let position = headers.get(code)?;
    let cell = row.get(position)?.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(cell)
    }
}

/// A dependency is unusable when it is null or the literal `0`, which ONSPD
/// uses for postcodes without a grid reference.
fn dependency_unusable(row: &[String], headers: &HeaderMap, code: &str) -> bool {
    matches!(read_cell(row, headers, code), None | Some("0"))
}

pub fn coerce(value: &str, field_type: FieldType) -> Option<Value> {
    match field_type {
        FieldType::Int => {
            if let Ok(parsed) = value.parse::<i64>() {
                return Some(Value::Integer(parsed));
            }
            let parsed = value.parse::<f64>().ok()?;
            let truncated = parsed.trunc();
            if truncated.is_finite()
                && truncated >= i64::MIN as f64
                && truncated < i64::MAX as f64
            {
                Some(Value::Integer(truncated as i64))
            } else {
                None
            }
        }
        FieldType::Float => value.parse::<f64>().ok().map(Value::Float),
    }
}

fn extract_field(
    row: &[String],
    headers: &HeaderMap,
    mapping: &FieldMapping,
    report: &mut RunReport,
) -> Option<Value> {
    let raw = read_cell(row, headers, &mapping.source)?;
    if mapping
        .depends_on
        .as_deref()
        .is_some_and(|dependency| dependency_unusable(row, headers, dependency))
    {
        return None;
    }

    let text = match &mapping.transform {
        Some(transform) => match transform.apply(raw) {
            Ok(Some(out)) if !out.is_empty() => out,
            Ok(_) => return None,
            Err(err) => {
                debug!("Transform failed for {}: {err}", mapping.column);
                report.transform_failures += 1;
                return None;
            }
        },
        None => raw.to_string(),
    };

    match mapping.field_type {
        Some(field_type) => {
            let coerced = coerce(&text, field_type);
            if coerced.is_none() {
                debug!(
                    "Could not coerce '{text}' to {field_type} for {}",
                    mapping.column
                );
                report.coercion_failures += 1;
            }
            coerced
        }
        None => Some(Value::String(text)),
    }
}

/// Produces one record holding every mapped column, null where extraction
/// yielded nothing. Rows without a postcode are left for the caller to drop.
pub fn extract_record(
    row: &[String],
    headers: &HeaderMap,
    mappings: &MappingTable,
    report: &mut RunReport,
) -> FlatRecord {
    let mut record = FlatRecord::new();
    for mapping in mappings {
        let value = extract_field(row, headers, mapping, report);
        record.set(mapping.column.as_str(), value);
    }
    record
}
