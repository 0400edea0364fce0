use std::sync::LazyLock;

use regex::Regex;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<big>([^<]+)</big>").unwrap());
static SECTION_BODY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<td colspan="3"[^>]*>(.*?)(?:<td colspan="3"|</table>)"#).unwrap()
});

const TABLE_OPEN: &str = r#"<table class="wikitable""#;

// Category header rows reuse the same table markup as trusts; their names
// are fixed and never valid trust names.
const CATEGORY_HEADERS: &[&str] = &[
    "",
    "Tanks",
    "Melee Fighter",
    "Ranged Fighter",
    "Offensive Caster",
    "Healer",
    "Support",
    "Special",
    "Unity Concord",
];

/// Split a page into wikitable fragments, one candidate trust each.
/// The fragment starts just past the opening tag; that is fine for the
/// field/section regexes, which only look inside the table body.
pub fn split_tables(html: &str) -> Vec<&str> {
    html.split(TABLE_OPEN).skip(1).collect()
}

/// Trust name from the table's `<big>` header, if any.
pub fn table_name(table: &str) -> Option<String> {
    NAME_RE
        .captures(table)
        .map(|caps| caps[1].trim().to_string())
}

pub fn is_category_header(name: &str) -> bool {
    CATEGORY_HEADERS.contains(&name)
}

/// Raw inner markup of a labeled field cell: `<td>Job</td><td>…</td>`.
pub fn extract_field(table: &str, field: &str) -> Option<String> {
    let re = Regex::new(&format!(
        r"(?is)<td[^>]*>\s*{}\s*</td>\s*<td[^>]*>(.*?)</td>",
        regex::escape(field)
    ))
    .unwrap();
    re.captures(table).map(|caps| caps[1].to_string())
}

/// Raw inner markup of a full-width section (`Acquisition`, `Special
/// Features`): the `colspan="3"` cell following the section's span header,
/// up to the next such cell or the end of the table.
pub fn extract_section(table: &str, section: &str) -> Option<String> {
    let header_re = Regex::new(&format!(
        r"(?i)<span[^>]*>{}</span>",
        regex::escape(section)
    ))
    .unwrap();
    let header = header_re.find(table)?;
    SECTION_BODY_RE
        .captures(&table[header.end()..])
        .map(|caps| caps[1].to_string())
}
