use serde::Deserialize;
use std::path::Path;

use crate::config::ConfigError;

pub const GENERIC_FISH_MARKER: &str = "鱼";
pub const DEFAULT_PLACEHOLDER: &str = "暂无详细描述信息。";

const BUILTIN_SPECIES: [(&str, &str); 10] = [
    ("鲤鱼", "鲤鱼是一种常见的淡水鱼，适应性强，生长迅速。"),
    ("草鱼", "草鱼以水草为食，生长速度快，是重要的养殖鱼类。"),
    ("鲈鱼", "鲈鱼是优质的海水鱼类，肉质鲜美，经济价值高。"),
    ("罗非鱼", "罗非鱼生长快，适应性强，是重要的热带养殖鱼类。"),
    ("鲫鱼", "鲫鱼体型较小，适应能力强，分布广泛。"),
    ("金鱼", "金鱼是观赏鱼类，常见于水族馆和家庭鱼缸。"),
    ("鲑鱼", "鲑鱼是洄游性鱼类，肉质鲜美富含Omega-3。"),
    ("鲶鱼", "鲶鱼是无鳞鱼，喜欢栖息在底层水域，杂食性。"),
    ("鳟鱼", "鳟鱼是冷水性鱼类，肉质细嫩，适合多种烹饪方式。"),
    ("石斑鱼", "石斑鱼是高档海水鱼，肉质鲜美，经济价值高。"),
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeciesEntry {
    pub name: String,
    pub description: String,
}

/// Fish keywords and species descriptions used to pick and explain a label.
///
/// Built once at startup and shared read-only; descriptions keep their
/// declaration order because the containment fallback takes the first hit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeciesCatalog {
    #[serde(default = "default_marker")]
    pub generic_marker: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub descriptions: Vec<SpeciesEntry>,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

fn default_marker() -> String {
    GENERIC_FISH_MARKER.to_string()
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

impl Default for SpeciesCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SpeciesCatalog {
    pub fn builtin() -> Self {
        Self {
            generic_marker: default_marker(),
            keywords: BUILTIN_SPECIES
                .iter()
                .map(|(name, _)| name.to_string())
                .collect(),
            descriptions: BUILTIN_SPECIES
                .iter()
                .map(|(name, description)| SpeciesEntry {
                    name: name.to_string(),
                    description: description.to_string(),
                })
                .collect(),
            placeholder: default_placeholder(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::from_yaml(&raw)?;
        log::info!(
            "Loaded species catalog from {} ({} keywords, {} descriptions)",
            path.display(),
            catalog.keywords.len(),
            catalog.descriptions.len()
        );
        Ok(catalog)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let mut catalog: SpeciesCatalog = serde_yaml::from_str(raw)?;
        // Every described species is implicitly a keyword.
        for entry in &catalog.descriptions {
            if !catalog.keywords.contains(&entry.name) {
                catalog.keywords.push(entry.name.clone());
            }
        }
        catalog.keywords.retain(|k| !k.is_empty());
        Ok(catalog)
    }

    /// Substring match on the generic marker or any species keyword.
    pub fn is_fish(&self, name: &str) -> bool {
        (!self.generic_marker.is_empty() && name.contains(self.generic_marker.as_str()))
            || self.keywords.iter().any(|k| name.contains(k.as_str()))
    }

    /// Exact name first, then the first species name contained in `name`.
    pub fn describe(&self, name: &str) -> Option<&str> {
        self.descriptions
            .iter()
            .find(|entry| entry.name == name)
            .or_else(|| {
                self.descriptions
                    .iter()
                    .find(|entry| !entry.name.is_empty() && name.contains(entry.name.as_str()))
            })
            .map(|entry| entry.description.as_str())
    }
}
