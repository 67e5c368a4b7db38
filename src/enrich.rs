//! Adds readable labels next to coded administrative fields.

use crate::{lookup::LookupTables, record::FlatRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentRule {
    pub code_field: &'static str,
    pub table: &'static str,
    pub label_field: &'static str,
}

const fn rule(
    code_field: &'static str,
    table: &'static str,
    label_field: &'static str,
) -> EnrichmentRule {
    EnrichmentRule {
        code_field,
        table,
        label_field,
    }
}

/// `ccg_id` carries SICBL codes and `nuts_id` carries ITL codes; both are
/// still resolved through the historically named tables.
pub const ONSPD_RULES: &[EnrichmentRule] = &[
    rule("country_code", "countries", "country"),
    rule("admin_district_id", "districts", "admin_district"),
    rule("admin_county_id", "counties", "admin_county"),
    rule("admin_ward_id", "wards", "admin_ward"),
    rule("parish_id", "parishes", "parish"),
    rule("constituency_id", "constituencies", "parliamentary_constituency"),
    rule("region_code", "regions", "region"),
    rule(
        "european_electoral_region_code",
        "european_registers",
        "european_electoral_region",
    ),
    rule("primary_care_trust_code", "pcts", "primary_care_trust"),
    rule("ccg_id", "ccgs", "ccg"),
    rule("lsoa_id", "lsoa", "lsoa"),
    rule("msoa_id", "msoa", "msoa"),
    rule("nuts_id", "nuts", "nuts"),
    rule("pfa_id", "police_force_areas", "pfa"),
    rule("ced_id", "ceds", "ced"),
    rule("nhs_ha_code", "nhsHa", "nhs_ha"),
];

pub struct Enricher<'a> {
    tables: &'a LookupTables,
    rules: &'a [EnrichmentRule],
}

impl<'a> Enricher<'a> {
    pub fn new(tables: &'a LookupTables) -> Self {
        Self::with_rules(tables, ONSPD_RULES)
    }

    pub fn with_rules(tables: &'a LookupTables, rules: &'a [EnrichmentRule]) -> Self {
        Self { tables, rules }
    }

    /// Inserts each resolvable label. Code fields and columns the record
    /// already carries are never touched, and an unknown code or an unloaded
    /// table simply leaves the label unset.
    pub fn enrich(&self, record: &mut FlatRecord) {
        for rule in self.rules {
            if record.contains(rule.label_field) {
                continue;
            }
            let Some(table) = self.tables.get(rule.table) else {
                continue;
            };
            let Some(code) = record.get(rule.code_field).map(|v| v.as_display()) else {
                continue;
            };
            if let Some(label) = table.resolve(&code) {
                record.set(rule.label_field, Some(label.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lookup::LookupTable,
        record::Value,
    };

    fn tables() -> LookupTables {
        let mut tables = LookupTables::new();
        tables.insert(
            "countries",
            LookupTable::from_pairs([("E92000001", "England")]),
        );
        tables.insert(
            "districts",
            LookupTable::from_pairs([("E09000033", "Westminster")]),
        );
        tables
    }

    #[test]
    fn adds_label_alongside_code() {
        let tables = tables();
        let mut record = FlatRecord::new();
        record.set("country_code", Some(Value::from("E92000001")));
        Enricher::new(&tables).enrich(&mut record);

        assert_eq!(record.get_str("country_code"), Some("E92000001"));
        assert_eq!(record.get_str("country"), Some("England"));
    }

    #[test]
    fn unknown_code_leaves_label_unset() {
        let tables = tables();
        let mut record = FlatRecord::new();
        record.set("admin_district_id", Some(Value::from("E06000001")));
        Enricher::new(&tables).enrich(&mut record);

        assert_eq!(record.get_str("admin_district_id"), Some("E06000001"));
        assert!(!record.contains("admin_district"));
    }

    #[test]
    fn extracted_column_is_not_overwritten_by_label() {
        let tables = tables();
        let mut record = FlatRecord::new();
        record.set("country_code", Some(Value::from("E92000001")));
        record.set("country", Some(Value::from("ENG")));
        Enricher::new(&tables).enrich(&mut record);
        assert_eq!(record.get_str("country"), Some("ENG"));

        let mut nulled = FlatRecord::new();
        nulled.set("country_code", Some(Value::from("E92000001")));
        nulled.set("country", None);
        Enricher::new(&tables).enrich(&mut nulled);
        assert!(nulled.get("country").is_none());
    }

    #[test]
    fn missing_table_and_null_code_are_skipped() {
        let tables = tables();
        let mut record = FlatRecord::new();
        record.set("country_code", None);
        record.set("region_code", Some(Value::from("E12000007")));
        let before = record.clone();
        Enricher::new(&tables).enrich(&mut record);
        assert_eq!(record, before);
    }
}
