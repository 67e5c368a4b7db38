//! Groups active flat records into the nested per-postcode output structure.

use std::collections::{BTreeMap, btree_map::Entry};

use log::info;
use serde::Serialize;

use crate::{
    ingest::{POSTCODE_COLUMN, TERMINATION_COLUMN},
    record::{FlatRecord, Value},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
    pub eastings: Option<Value>,
    pub northings: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Administrative {
    pub country: Option<Value>,
    pub admin_district: Option<Value>,
    pub admin_county: Option<Value>,
    pub admin_ward: Option<Value>,
    pub parish: Option<Value>,
    pub constituency: Option<Value>,
    pub region: Option<Value>,
    pub european_electoral_region: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Healthcare {
    pub ccg: Option<Value>,
    pub primary_care_trust: Option<Value>,
    pub nhs_ha: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistical {
    pub lsoa: Option<Value>,
    pub msoa: Option<Value>,
    pub nuts: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Codes {
    pub country_code: Option<Value>,
    pub admin_district_id: Option<Value>,
    pub admin_county_id: Option<Value>,
    pub admin_ward_id: Option<Value>,
    pub parish_id: Option<Value>,
    pub constituency_id: Option<Value>,
    pub ccg_id: Option<Value>,
    pub lsoa_id: Option<Value>,
    pub msoa_id: Option<Value>,
    pub nuts_id: Option<Value>,
    pub pfa_id: Option<Value>,
    pub ced_id: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnhancedPostcodeEntry {
    pub coordinates: Coordinates,
    pub administrative: Administrative,
    pub healthcare: Healthcare,
    pub statistical: Statistical,
    pub codes: Codes,
    pub quality: Option<Value>,
    pub date_introduced: Option<Value>,
    pub incode: Option<Value>,
    pub outcode: Option<Value>,
}

impl EnhancedPostcodeEntry {
    pub fn from_record(record: &FlatRecord) -> Self {
        let field = |name: &str| record.get(name).cloned();
        Self {
            coordinates: Coordinates {
                latitude: field("latitude"),
                longitude: field("longitude"),
                eastings: field("eastings"),
                northings: field("northings"),
            },
            administrative: Administrative {
                country: field("country"),
                admin_district: field("admin_district"),
                admin_county: field("admin_county"),
                admin_ward: field("admin_ward"),
                parish: field("parish"),
                constituency: field("parliamentary_constituency"),
                region: field("region"),
                european_electoral_region: field("european_electoral_region"),
            },
            healthcare: Healthcare {
                ccg: field("ccg"),
                primary_care_trust: field("primary_care_trust"),
                nhs_ha: field("nhs_ha"),
            },
            statistical: Statistical {
                lsoa: field("lsoa"),
                msoa: field("msoa"),
                nuts: field("nuts"),
            },
            codes: Codes {
                country_code: field("country_code"),
                admin_district_id: field("admin_district_id"),
                admin_county_id: field("admin_county_id"),
                admin_ward_id: field("admin_ward_id"),
                parish_id: field("parish_id"),
                constituency_id: field("constituency_id"),
                ccg_id: field("ccg_id"),
                lsoa_id: field("lsoa_id"),
                msoa_id: field("msoa_id"),
                nuts_id: field("nuts_id"),
                pfa_id: field("pfa_id"),
                ced_id: field("ced_id"),
            },
            quality: field("quality"),
            date_introduced: field("date_of_introduction"),
            incode: field("incode"),
            outcode: field("outcode"),
        }
    }
}

/// Active postcodes keyed (and therefore ordered) by postcode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub entries: BTreeMap<String, EnhancedPostcodeEntry>,
    /// Records that replaced an earlier record with the same postcode.
    pub duplicate_keys: usize,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, postcode: &str) -> Option<&EnhancedPostcodeEntry> {
        self.entries.get(postcode)
    }
}

/// Builds one entry per distinct active postcode; a later record for the
/// same postcode overwrites the earlier one and is counted as a duplicate.
pub fn assemble<'r, I>(records: I) -> Dataset
where
    I: IntoIterator<Item = &'r FlatRecord>,
{
    let mut dataset = Dataset::default();
    let mut seen = 0usize;
    for record in records {
        seen += 1;
        if !record.is_null(TERMINATION_COLUMN) {
            continue;
        }
        let Some(postcode) = record
            .get(POSTCODE_COLUMN)
            .filter(|value| !value.is_blank())
            .map(Value::as_display)
        else {
            continue;
        };
        let entry = EnhancedPostcodeEntry::from_record(record);
        match dataset.entries.entry(postcode) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(entry);
                dataset.duplicate_keys += 1;
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
            }
        }
    }
    info!("Active postcodes: {} out of {seen}", dataset.len());
    dataset
}
