//! Unit template loader.

use std::path::Path;

use tactics_core::UnitSpec;

use crate::loaders::{LoadResult, read_file};
use crate::templates::TemplateBook;

/// Loads unit templates from a RON list of [`UnitSpec`]s.
pub struct UnitLoader;

impl UnitLoader {
    pub fn load(path: &Path) -> LoadResult<TemplateBook> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<TemplateBook> {
        let specs: Vec<UnitSpec> =
            ron::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse unit templates RON: {}", e))?;

        let mut book = TemplateBook::new();
        for spec in specs {
            if spec.template.is_empty() {
                anyhow::bail!("unit template without a name");
            }
            if book.get(&spec.template).is_ok() {
                anyhow::bail!("unit template '{}' defined twice", spec.template);
            }
            book.insert(spec);
        }
        tracing::debug!(target: "tactics::content", templates = book.len(), "unit templates loaded");
        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactics_core::Faction;

    const UNITS: &str = r#"[
        (template: "orc", name: "orc", hp: 15, tags: ["evil"], facts: ["flat_dr/2"]),
        (template: "ally", hp: 10, faction: player),
    ]"#;

    #[test]
    fn parses_a_list_of_specs() {
        let book = UnitLoader::parse(UNITS).unwrap();
        assert_eq!(book.len(), 2);
        let orc = book.get("orc").unwrap();
        assert_eq!(orc.hp, 15);
        assert_eq!(orc.facts, ["flat_dr/2"]);
        assert_eq!(orc.stats.ac, 10);
        assert_eq!(book.get("ally").unwrap().faction, Faction::Player);
    }

    #[test]
    fn duplicate_templates_are_rejected() {
        let err = UnitLoader::parse(r#"[(template: "a", hp: 1), (template: "a", hp: 2)]"#).unwrap_err();
        assert!(err.to_string().contains("twice"));
    }
}
