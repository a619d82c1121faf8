//! Ordered keyword rules that map noisy biological-target labels onto a small
//! category set, plus client/product aliasing.
//!
//! A [`Classifier`] is pure data: the exit-port and destination taxonomies are
//! two configurations of the same type. Rule order matters. The first rule
//! with a keyword contained in the upper-cased label wins, so a label naming
//! both mites and thrips resolves to whichever rule is listed first.

pub mod alias;

use serde::{Deserialize, Serialize};

pub use alias::{AliasRules, EntityAliaser, ProductRules, SubstringAlias};

/// Any keyword found in the label selects `category`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub keywords: Vec<String>,
    pub category: String,
}

impl CategoryRule {
    pub fn new<S: AsRef<str>>(keywords: &[S], category: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.as_ref().to_string()).collect(),
            category: category.to_string(),
        }
    }
}

/// Serializable rule table for one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub rules: Vec<CategoryRule>,
    pub default_category: String,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<CategoryRule>,
    default_category: String,
}

impl Classifier {
    /// Keywords are upper-cased once here; rule order is kept as given.
    pub fn new(rules: Vec<CategoryRule>, default_category: impl Into<String>) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| CategoryRule {
                keywords: r.keywords.iter().map(|k| k.to_uppercase()).collect(),
                category: r.category,
            })
            .collect();
        Self {
            rules,
            default_category: default_category.into(),
        }
    }

    pub fn from_config(cfg: &ClassifierConfig) -> Self {
        Self::new(cfg.rules.clone(), cfg.default_category.clone())
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    pub fn classify(&self, raw: Option<&str>) -> &str {
        let Some(text) = raw else {
            return &self.default_category;
        };
        let upper = text.to_uppercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| upper.contains(k.as_str())))
            .map(|rule| rule.category.as_str())
            .unwrap_or(&self.default_category)
    }

    /// Category set: rule categories in first-seen order, then the default.
    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::with_capacity(self.rules.len() + 1);
        for rule in &self.rules {
            if !out.contains(&rule.category.as_str()) {
                out.push(&rule.category);
            }
        }
        if !out.contains(&self.default_category.as_str()) {
            out.push(&self.default_category);
        }
        out
    }
}

/// Exit-port taxonomy.
pub fn exit_port_rules() -> ClassifierConfig {
    ClassifierConfig {
        rules: vec![
            CategoryRule::new(&["ACAR"], "Acaros"),
            CategoryRule::new(&["AFID"], "Afidos"),
            CategoryRule::new(&["BABOS"], "Babosa"),
            CategoryRule::new(&["DIPTER", "MOSCA"], "Diptero"),
            CategoryRule::new(&["MINA"], "Minador"),
            CategoryRule::new(&["MOLUS", "CARAC"], "Moluscos"),
            CategoryRule::new(&["TRIP"], "Trips"),
        ],
        default_category: "OTROS".to_string(),
    }
}

/// Destination taxonomy, grouped by insect order.
pub fn destination_rules() -> ClassifierConfig {
    ClassifierConfig {
        rules: vec![
            CategoryRule::new(&["TRIP", "THRIP", "THYSAN", "THRIPIDAE"], "Thysanoptera"),
            CategoryRule::new(&["AFID", "HEMIP", "COCHIN"], "Hemiptera"),
            CategoryRule::new(&["ACAR"], "Acari"),
            CategoryRule::new(&["BABOS", "CARAC", "MOLUS"], "Moluscos"),
            CategoryRule::new(&["DIPTER", "MOSCA"], "Diptera"),
            CategoryRule::new(&["MINA"], "Minador"),
            CategoryRule::new(&["LEPID"], "Lepidoptera"),
            CategoryRule::new(&["GRILL", "ORTHOP"], "Orthoptera"),
            CategoryRule::new(&["ENTYLOMA", "HONGO"], "Hongos"),
            CategoryRule::new(&["POSTURA"], "Postura Insecto"),
        ],
        default_category: "No especificado".to_string(),
    }
}
