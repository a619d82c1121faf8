use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::process::record::Record;

/// Name of the count column in every reporting table.
pub const COUNT_COLUMN: &str = "interceptaciones";

/// Record attribute a reporting table can group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Site,
    Packhouse,
    Country,
    Client,
    DestinationPort,
    Product,
    Category,
    Year,
}

impl Dimension {
    pub fn value(self, r: &Record) -> Option<String> {
        match self {
            Dimension::Site => r.site.clone(),
            Dimension::Packhouse => r.packhouse.clone(),
            Dimension::Country => r.country.clone(),
            Dimension::Client => r.client.clone(),
            Dimension::DestinationPort => r.destination_port.clone(),
            Dimension::Product => r.product.clone(),
            Dimension::Category => Some(r.target_category.clone()),
            Dimension::Year => r.year.map(|y| y.to_string()),
        }
    }

    /// Column name used in chart bindings.
    pub fn column(self) -> &'static str {
        match self {
            Dimension::Site => "predio",
            Dimension::Packhouse => "poscosecha_proceso",
            Dimension::Country => "pais",
            Dimension::Client => "cliente",
            Dimension::DestinationPort => "puerto_destino",
            Dimension::Product => "producto_norm",
            Dimension::Category => "blanco_norm",
            Dimension::Year => "ano",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub keys: Vec<String>,
    pub count: u64,
}

/// Dimension combination → number of interceptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingTable {
    pub dimensions: Vec<Dimension>,
    pub rows: Vec<ReportRow>,
}

impl ReportingTable {
    pub fn total(&self) -> u64 {
        self.rows.iter().map(|r| r.count).sum()
    }

    pub fn position(&self, dim: Dimension) -> Option<usize> {
        self.dimensions.iter().position(|d| *d == dim)
    }

    pub fn count_for(&self, keys: &[&str]) -> u64 {
        self.rows
            .iter()
            .find(|r| r.keys.iter().map(String::as_str).eq(keys.iter().copied()))
            .map(|r| r.count)
            .unwrap_or(0)
    }
}

pub fn filter_year(records: &[Record], year: i32) -> Vec<&Record> {
    records.iter().filter(|r| r.year == Some(year)).collect()
}

pub fn filter_years<'a>(records: &[&'a Record], years: &[i32]) -> Vec<&'a Record> {
    records
        .iter()
        .copied()
        .filter(|r| r.year.is_some_and(|y| years.contains(&y)))
        .collect()
}

pub fn filter_categories<'a>(records: &[&'a Record], categories: &[String]) -> Vec<&'a Record> {
    records
        .iter()
        .copied()
        .filter(|r| categories.contains(&r.target_category))
        .collect()
}

/// Group-by-size. Records missing any of the keys are left out; rows come out
/// sorted by key (years numerically).
pub fn count_by(records: &[&Record], dims: &[Dimension]) -> ReportingTable {
    let mut counts: BTreeMap<Vec<SortKey>, u64> = BTreeMap::new();
    for r in records {
        let keys: Option<Vec<SortKey>> = dims
            .iter()
            .map(|d| d.value(r).map(|v| SortKey::new(*d, v)))
            .collect();
        if let Some(keys) = keys {
            *counts.entry(keys).or_insert(0) += 1;
        }
    }
    ReportingTable {
        dimensions: dims.to_vec(),
        rows: counts
            .into_iter()
            .map(|(keys, count)| ReportRow {
                keys: keys.into_iter().map(|k| k.text).collect(),
                count,
            })
            .collect(),
    }
}

/// Single-dimension counts, largest first (ties by key).
pub fn value_counts(records: &[&Record], dim: Dimension) -> ReportingTable {
    let mut table = count_by(records, &[dim]);
    // stable sort keeps key order among ties
    table.rows.sort_by(|a, b| b.count.cmp(&a.count));
    table
}

/// The `n` most frequent values of `dim`.
pub fn top_values(records: &[&Record], dim: Dimension, n: usize) -> Vec<String> {
    value_counts(records, dim)
        .rows
        .into_iter()
        .take(n)
        .filter_map(|r| r.keys.into_iter().next())
        .collect()
}

/// Keep rows whose `dim` key is in `keep`.
pub fn restrict_to(table: &ReportingTable, dim: Dimension, keep: &[String]) -> ReportingTable {
    let Some(pos) = table.position(dim) else {
        return table.clone();
    };
    let keep: HashSet<&str> = keep.iter().map(String::as_str).collect();
    ReportingTable {
        dimensions: table.dimensions.clone(),
        rows: table
            .rows
            .iter()
            .filter(|r| keep.contains(r.keys[pos].as_str()))
            .cloned()
            .collect(),
    }
}

/// Keep the `n` values of `dim` with the largest summed count.
pub fn top_by_total(table: &ReportingTable, dim: Dimension, n: usize) -> ReportingTable {
    let Some(pos) = table.position(dim) else {
        return table.clone();
    };
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for row in &table.rows {
        *totals.entry(row.keys[pos].as_str()).or_insert(0) += row.count;
    }
    let mut ranked: Vec<(&str, u64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let keep: Vec<String> = ranked.into_iter().take(n).map(|(k, _)| k.to_string()).collect();
    restrict_to(table, dim, &keep)
}

/// Force a category order: rows outside `order` are dropped and the rest are
/// sorted by their category's position (then by the remaining keys).
pub fn order_categories(table: &ReportingTable, order: &[String]) -> ReportingTable {
    let Some(pos) = table.position(Dimension::Category) else {
        return table.clone();
    };
    let rank: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();
    let mut rows: Vec<ReportRow> = table
        .rows
        .iter()
        .filter(|r| rank.contains_key(r.keys[pos].as_str()))
        .cloned()
        .collect();
    rows.sort_by_key(|r| rank[r.keys[pos].as_str()]);
    ReportingTable {
        dimensions: table.dimensions.clone(),
        rows,
    }
}

/// Counts per category and year, with the change between consecutive years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearOverYear {
    pub category: String,
    pub counts: BTreeMap<i32, u64>,
    /// `((from, to), percent)` for each consecutive year pair.
    pub variations: Vec<((i32, i32), f64)>,
}

/// Built from a (year, category) table. A zero base year divides by 1.
pub fn year_over_year(kpi: &ReportingTable, years: &[i32]) -> Vec<YearOverYear> {
    let (Some(ypos), Some(cpos)) = (kpi.position(Dimension::Year), kpi.position(Dimension::Category))
    else {
        return Vec::new();
    };

    let mut by_category: BTreeMap<String, BTreeMap<i32, u64>> = BTreeMap::new();
    for row in &kpi.rows {
        if let Ok(year) = row.keys[ypos].parse::<i32>() {
            *by_category
                .entry(row.keys[cpos].clone())
                .or_default()
                .entry(year)
                .or_insert(0) += row.count;
        }
    }

    by_category
        .into_iter()
        .map(|(category, found)| {
            let counts: BTreeMap<i32, u64> = years
                .iter()
                .map(|y| (*y, found.get(y).copied().unwrap_or(0)))
                .collect();
            let variations = years
                .windows(2)
                .map(|w| {
                    let base = counts[&w[0]] as f64;
                    let next = counts[&w[1]] as f64;
                    let divisor = if base == 0.0 { 1.0 } else { base };
                    ((w[0], w[1]), (next - base) / divisor * 100.0)
                })
                .collect();
            YearOverYear {
                category,
                counts,
                variations,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskRow {
    pub site: String,
    /// One count per matrix category, in column order.
    pub counts: Vec<u64>,
    pub total: u64,
}

/// Site × category interception counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskMatrix {
    pub categories: Vec<String>,
    pub rows: Vec<RiskRow>,
}

/// Sites ranked by total interceptions across `categories`, top `limit`.
pub fn risk_matrix(records: &[&Record], categories: &[String], limit: usize) -> RiskMatrix {
    let relevant = filter_categories(records, categories);
    let table = count_by(&relevant, &[Dimension::Site, Dimension::Category]);

    let mut per_site: BTreeMap<String, Vec<u64>> = BTreeMap::new();
    for row in table.rows {
        let counts = per_site
            .entry(row.keys[0].clone())
            .or_insert_with(|| vec![0; categories.len()]);
        if let Some(i) = categories.iter().position(|c| *c == row.keys[1]) {
            counts[i] += row.count;
        }
    }

    let mut rows: Vec<RiskRow> = per_site
        .into_iter()
        .map(|(site, counts)| RiskRow {
            total: counts.iter().sum(),
            site,
            counts,
        })
        .collect();
    rows.sort_by(|a, b| b.total.cmp(&a.total));
    rows.truncate(limit);

    RiskMatrix {
        categories: categories.to_vec(),
        rows,
    }
}

/// Units lost to interceptions against units exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StemImpact {
    pub exported: f64,
    pub lost: f64,
    pub loss_pct: f64,
}

pub fn stem_impact(records: &[&Record], count_column: &str, exported: f64) -> StemImpact {
    let lost: f64 = records.iter().map(|r| r.count(count_column)).sum();
    let loss_pct = if exported > 0.0 {
        lost / exported * 100.0
    } else {
        0.0
    };
    StemImpact {
        exported,
        lost,
        loss_pct,
    }
}

/// Sort key that orders years numerically and everything else as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    numeric: Option<i64>,
    text: String,
}

impl SortKey {
    fn new(dim: Dimension, text: String) -> Self {
        let numeric = match dim {
            Dimension::Year => text.parse().ok(),
            _ => None,
        };
        Self { numeric, text }
    }
}
