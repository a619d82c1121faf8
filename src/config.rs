//! Run configuration: which files to read, how to find their header row, and
//! the rule tables that turn free text into categories and canonical names.
//!
//! [`ReportConfig::default`] carries the two built-in datasets; a YAML file can
//! replace any top-level key.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

use crate::classify::{
    alias::{destination_aliases, exit_port_aliases},
    destination_rules, exit_port_rules, AliasRules, ClassifierConfig, ProductRules,
};
use crate::process::header::HeaderSignature;
use crate::process::record::TextField;
use crate::process::utils::ColumnKeyStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetKind {
    ExitPort,
    Destination,
}

/// Column key feeding each record attribute. `None` means the dataset
/// does not carry that attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub site: Option<String>,
    pub packhouse: Option<String>,
    pub client: Option<String>,
    pub country: Option<String>,
    pub destination_port: Option<String>,
    pub product: Option<String>,
    /// Biological-target column. Required.
    pub target: String,
    pub year: Option<String>,
    pub date: Option<String>,
}

impl ColumnMap {
    pub fn key(&self, field: TextField) -> Option<&str> {
        match field {
            TextField::Site => self.site.as_deref(),
            TextField::Packhouse => self.packhouse.as_deref(),
            TextField::Client => self.client.as_deref(),
            TextField::Country => self.country.as_deref(),
            TextField::DestinationPort => self.destination_port.as_deref(),
            TextField::Product => self.product.as_deref(),
            TextField::Target => Some(self.target.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub kind: DatasetKind,
    pub source_path: PathBuf,
    pub sheet_name: String,
    pub header_signature: HeaderSignature,
    #[serde(default)]
    pub column_keys: ColumnKeyStyle,
    pub columns: ColumnMap,
    /// Text fields whose normalized value must not be an invalid sentinel.
    #[serde(default)]
    pub validated_fields: Vec<TextField>,
    #[serde(default)]
    pub invalid_values: Vec<String>,
    /// Count columns coerced to numbers (missing or unparsable → 0).
    #[serde(default)]
    pub count_columns: Vec<String>,
    pub category_rules: ClassifierConfig,
    #[serde(default)]
    pub alias_rules: AliasRules,
    #[serde(default)]
    pub product_rules: Option<ProductRules>,
    /// Categories kept, in this order, by charts that force a category order.
    #[serde(default)]
    pub category_order: Vec<String>,
    /// Units exported in the report year, for the stem-impact summary.
    #[serde(default)]
    pub exported_units: Option<f64>,
    #[serde(default)]
    pub palette: Vec<String>,
}

impl DatasetConfig {
    pub fn exit_port() -> Self {
        Self {
            kind: DatasetKind::ExitPort,
            source_path: PathBuf::from("DatosSalida.xlsx"),
            sheet_name: "BASE PUERTO SALIDA".to_string(),
            header_signature: HeaderSignature::from_builtin(&["PRODUCTO", "AÑO"]),
            column_keys: ColumnKeyStyle::default(),
            columns: ColumnMap {
                site: Some("predio".into()),
                packhouse: Some("poscosecha_proceso".into()),
                client: Some("cliente".into()),
                country: Some("pais".into()),
                destination_port: None,
                product: None,
                target: "blanco_biologico".into(),
                year: Some("ano".into()),
                date: Some("fecha".into()),
            },
            validated_fields: vec![
                TextField::Site,
                TextField::Packhouse,
                TextField::Country,
                TextField::Client,
                TextField::Target,
            ],
            invalid_values: ["No", "N/A", "None", ""].map(String::from).to_vec(),
            count_columns: [
                "cuenta",
                "cuenta_producto",
                "total_piezas",
                "total_tallos_rechazados",
            ]
            .map(String::from)
            .to_vec(),
            category_rules: exit_port_rules(),
            alias_rules: exit_port_aliases(),
            product_rules: None,
            category_order: ["Trips", "Afidos"].map(String::from).to_vec(),
            exported_units: Some(22_433_766.0),
            palette: ["#6A0DAD", "#B19CD9"].map(String::from).to_vec(),
        }
    }

    pub fn destination() -> Self {
        Self {
            kind: DatasetKind::Destination,
            source_path: PathBuf::from("DatosDestino.xlsx"),
            sheet_name: "Base Interc.".to_string(),
            header_signature: HeaderSignature::from_builtin(&["PRODUCTO", "PUERTO DESTINO"]),
            column_keys: ColumnKeyStyle {
                strip_periods: true,
            },
            columns: ColumnMap {
                site: None,
                packhouse: None,
                client: Some("cliente".into()),
                country: None,
                destination_port: Some("puerto_destino".into()),
                product: Some("producto".into()),
                target: "blanco_biolog".into(),
                year: Some("ano".into()),
                date: Some("interception_date".into()),
            },
            validated_fields: Vec::new(),
            invalid_values: Vec::new(),
            count_columns: Vec::new(),
            category_rules: destination_rules(),
            alias_rules: destination_aliases(),
            product_rules: Some(ProductRules::default()),
            category_order: Vec::new(),
            exported_units: None,
            palette: ["#6A0DAD", "#B19CD9", "#9B59B6", "#D7BDE2", "#BB8FCE", "#7D3C98"]
                .map(String::from)
                .to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub report_year: i32,
    pub historical_years: Vec<i32>,
    /// How many entries the "top N" charts keep.
    pub top_n: usize,
    /// Rows kept in the site risk matrix.
    pub risk_matrix_rows: usize,
    pub exit_port: DatasetConfig,
    pub destination: DatasetConfig,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            report_year: 2025,
            historical_years: vec![2023, 2024, 2025],
            top_n: 10,
            risk_matrix_rows: 15,
            exit_port: DatasetConfig::exit_port(),
            destination: DatasetConfig::destination(),
        }
    }
}

impl ReportConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing report configuration")
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn dataset(&self, kind: DatasetKind) -> &DatasetConfig {
        match kind {
            DatasetKind::ExitPort => &self.exit_port,
            DatasetKind::Destination => &self.destination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_describe_both_datasets() {
        let cfg = ReportConfig::default();
        assert_eq!(cfg.report_year, 2025);
        assert_eq!(cfg.historical_years, vec![2023, 2024, 2025]);
        assert_eq!(
            cfg.exit_port.header_signature.tokens(),
            &["PRODUCTO".to_string(), "AÑO".to_string()]
        );
        assert_eq!(cfg.destination.sheet_name, "Base Interc.");
        assert!(cfg.destination.column_keys.strip_periods);
        assert_eq!(cfg.dataset(DatasetKind::Destination).kind, DatasetKind::Destination);
    }

    #[test]
    fn yaml_round_trip_keeps_rule_order() -> Result<()> {
        let cfg = ReportConfig::default();
        let text = serde_yaml::to_string(&cfg)?;
        let back = ReportConfig::from_yaml_str(&text)?;
        assert_eq!(back, cfg);
        Ok(())
    }

    #[test]
    fn partial_yaml_overrides_top_level_keys() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "report_year: 2024\nhistorical_years: [2022, 2023, 2024]")?;
        let cfg = ReportConfig::from_yaml_file(file.path())?;
        assert_eq!(cfg.report_year, 2024);
        assert_eq!(cfg.historical_years, vec![2022, 2023, 2024]);
        assert_eq!(cfg.exit_port, DatasetConfig::exit_port());
        Ok(())
    }
}
