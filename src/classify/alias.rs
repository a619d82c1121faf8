use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::process::utils::title_case;

/// Any name containing `pattern` is rewritten to `canonical`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstringAlias {
    pub pattern: String,
    pub canonical: String,
}

/// Client aliasing rules for one dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasRules {
    /// Exact spelling → canonical name. Checked first.
    pub exact: BTreeMap<String, String>,
    /// Ordered substring rewrites, first match wins.
    pub contains: Vec<SubstringAlias>,
    /// Canonical names whose records are excluded altogether.
    pub blocked: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct EntityAliaser {
    rules: AliasRules,
}

impl EntityAliaser {
    pub fn new(rules: AliasRules) -> Self {
        Self { rules }
    }

    pub fn canonicalize(&self, name: Option<&str>) -> Option<String> {
        let name = name?;
        if let Some(canonical) = self.rules.exact.get(name) {
            return Some(canonical.clone());
        }
        let rewritten = self
            .rules
            .contains
            .iter()
            .find(|alias| name.contains(alias.pattern.as_str()))
            .map(|alias| alias.canonical.clone());
        Some(rewritten.unwrap_or_else(|| name.to_string()))
    }

    pub fn is_blocked(&self, name: Option<&str>) -> bool {
        name.is_some_and(|n| self.rules.blocked.iter().any(|b| b == n))
    }
}

/// Product name clean-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductRules {
    /// Keep only the text before the first occurrence (`Rosa-Roja` → `Rosa`).
    pub delimiter: Option<char>,
    /// Names meaning "no product", compared case-insensitively.
    pub absent_values: Vec<String>,
    /// Drop records whose product ends up absent.
    pub drop_missing: bool,
}

impl Default for ProductRules {
    fn default() -> Self {
        Self {
            delimiter: Some('-'),
            absent_values: vec![
                "no identificado".to_string(),
                "no especificado".to_string(),
                "no intercep.".to_string(),
            ],
            drop_missing: true,
        }
    }
}

impl ProductRules {
    pub fn normalize(&self, raw: Option<&str>) -> Option<String> {
        let raw = raw?;
        let head = match self.delimiter {
            Some(d) => raw.split(d).next().unwrap_or(raw),
            None => raw,
        };
        let name = title_case(head.trim());
        let lower = name.to_lowercase();
        if self
            .absent_values
            .iter()
            .any(|a| a.to_lowercase() == lower)
        {
            return None;
        }
        Some(name)
    }
}

/// Exit-port clients: every Abco branch reports under one distributor.
pub fn exit_port_aliases() -> AliasRules {
    AliasRules {
        exact: BTreeMap::new(),
        contains: vec![SubstringAlias {
            pattern: "Abco".to_string(),
            canonical: "Distribuidora Abco S.A".to_string(),
        }],
        blocked: Vec::new(),
    }
}

pub fn destination_aliases() -> AliasRules {
    let exact = [
        ("Mm Bv Europa", "MM Flower BV Europe"),
        ("Mm Flower Bv Europe", "MM Flower BV Europe"),
        ("Sunburst Farms (Elite)", "Sunburst Farms"),
        ("Sunburst Farms Elite", "Sunburst Farms"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    AliasRules {
        exact,
        contains: Vec::new(),
        blocked: vec![
            "No Identificado".to_string(),
            "No Intercep.".to_string(),
            "Interceptaciones Ica".to_string(),
        ],
    }
}
