use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use crate::fetch::CATEGORY_URL;
use crate::parser::TrustRecord;

/// Write trustInformation.json: a metadata header plus a name-keyed map of
/// trust records. Matches the layout existing consumers of the file expect.
pub fn write_information_json(records: &[TrustRecord], path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let mut trusts = serde_json::Map::new();
    for record in records {
        trusts.insert(record.name.clone(), serde_json::to_value(record)?);
    }

    let output = json!({
        "metadata": {
            "source": CATEGORY_URL,
            "generated": chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            "trust_count": records.len(),
        },
        "trusts": trusts,
    });

    let pretty = serde_json::to_string_pretty(&output)?;
    std::fs::write(path, pretty)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {} trusts to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::richtext::InlineElement;

    fn sample_record() -> TrustRecord {
        TrustRecord {
            name: "Shantotto".to_string(),
            job: Some(vec![vec![InlineElement::Link {
                text: "Black Mage".to_string(),
                url: "https://www.bg-wiki.com/wiki/Black_Mage".to_string(),
            }]]),
            spells: None,
            abilities: None,
            weapon_skills: None,
            acquisition: None,
            special_features: None,
        }
    }

    #[test]
    fn output_layout() {
        let dir = std::env::temp_dir().join("trust_scraper_export_test");
        let path = dir.join("trustInformation.json");
        write_information_json(&[sample_record()], &path).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["metadata"]["trust_count"], 1);
        assert_eq!(parsed["metadata"]["source"], CATEGORY_URL);
        let record = &parsed["trusts"]["Shantotto"];
        assert_eq!(record["job"][0][0]["type"], "link");
        // Absent fields are null, not empty lists.
        assert!(record["spells"].is_null());

        std::fs::remove_dir_all(&dir).ok();
    }
}
