use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::config::DatasetConfig;
use crate::error::PipelineError;
use crate::process::raw_table::{Cell, Table};

/// Free-text attributes a dataset may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Site,
    Packhouse,
    Client,
    Country,
    DestinationPort,
    Product,
    Target,
}

impl TextField {
    pub const ALL: [TextField; 7] = [
        TextField::Site,
        TextField::Packhouse,
        TextField::Client,
        TextField::Country,
        TextField::DestinationPort,
        TextField::Product,
        TextField::Target,
    ];
}

/// One interception event after cleaning and classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub site: Option<String>,
    pub packhouse: Option<String>,
    pub client: Option<String>,
    pub country: Option<String>,
    pub destination_port: Option<String>,
    pub product: Option<String>,
    /// Normalized biological-target label as written in the source.
    pub target_raw: Option<String>,
    pub target_category: String,
    pub year: Option<i32>,
    pub date: Option<NaiveDate>,
    /// Count columns by key; every value is ≥ 0.
    pub counts: BTreeMap<String, f64>,
}

impl Record {
    pub fn count(&self, key: &str) -> f64 {
        self.counts.get(key).copied().unwrap_or(0.0)
    }
}

/// Resolved positions of the configured columns within one [`Table`].
#[derive(Debug)]
pub struct ColumnIndex {
    text: BTreeMap<TextField, Option<usize>>,
    pub year: Option<usize>,
    pub date: Option<usize>,
    pub counts: Vec<(String, Option<usize>)>,
}

impl ColumnIndex {
    /// Missing optional columns are logged once and read as empty; a missing
    /// biological-target column is an error.
    pub fn resolve(table: &Table, cfg: &DatasetConfig) -> Result<Self, PipelineError> {
        let target = &cfg.columns.target;
        if !table.has_column(target) {
            return Err(PipelineError::MissingColumn {
                column: target.clone(),
                header_row: table.header_row,
            });
        }

        let lookup = |key: Option<&str>| -> Option<usize> {
            let key = key?;
            let idx = table.column_index(key);
            if idx.is_none() {
                warn!(column = key, "configured column not present; values read as missing");
            }
            idx
        };

        let text = TextField::ALL
            .iter()
            .filter_map(|f| cfg.columns.key(*f).map(|k| (*f, lookup(Some(k)))))
            .collect();
        let counts = cfg
            .count_columns
            .iter()
            .map(|k| (k.clone(), lookup(Some(k))))
            .collect();

        Ok(Self {
            text,
            year: lookup(cfg.columns.year.as_deref()),
            date: lookup(cfg.columns.date.as_deref()),
            counts,
        })
    }

    /// Cell for `field`; fields the dataset does not map read as empty.
    pub fn text_cell<'a>(&self, row: &'a [Cell], field: TextField) -> &'a Cell {
        Table::cell(row, self.text.get(&field).copied().flatten())
    }
}
