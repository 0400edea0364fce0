pub mod richtext;
pub mod tables;

use std::collections::HashSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use self::richtext::Line;

/// One trust's extracted record. Absent fields serialize as `null`, never as
/// an empty list — consumers rely on the distinction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustRecord {
    pub name: String,
    pub job: Option<Vec<Line>>,
    pub spells: Option<Vec<Line>>,
    pub abilities: Option<Vec<Line>>,
    pub weapon_skills: Option<Vec<Line>>,
    pub acquisition: Option<Vec<Line>>,
    pub special_features: Option<Vec<Line>>,
}

/// Parse the Category:Trust page into records, in document order.
/// Category header tables and repeated names are skipped.
pub fn parse_category_page(html: &str) -> Vec<TrustRecord> {
    let candidates: Vec<Option<TrustRecord>> = tables::split_tables(html)
        .par_iter()
        .map(|table| build_record(table))
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut records = Vec::new();
    for record in candidates.into_iter().flatten() {
        if seen.contains(&record.name) {
            continue;
        }
        seen.insert(record.name.clone());
        records.push(record);
    }
    records
}

fn build_record(table: &str) -> Option<TrustRecord> {
    let name = tables::table_name(table)?;
    if tables::is_category_header(&name) {
        return None;
    }

    Some(TrustRecord {
        job: convert_field(table, "Job"),
        spells: convert_field(table, "Spells"),
        abilities: convert_field(table, "Abilities"),
        weapon_skills: convert_field(table, "Weapon Skills"),
        acquisition: convert_section(table, "Acquisition"),
        special_features: convert_section(table, "Special Features"),
        name,
    })
}

fn convert_field(table: &str, field: &str) -> Option<Vec<Line>> {
    tables::extract_field(table, field)
        .as_deref()
        .and_then(richtext::convert)
}

fn convert_section(table: &str, section: &str) -> Option<Vec<Line>> {
    tables::extract_section(table, section)
        .as_deref()
        .and_then(richtext::convert)
}
