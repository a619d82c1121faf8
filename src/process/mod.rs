// src/process/mod.rs
pub mod convert;
pub mod date_parser;
pub mod header;
pub mod raw_table;
pub mod record;
pub mod utils;

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::classify::{Classifier, EntityAliaser};
use crate::config::DatasetConfig;
use crate::error::PipelineError;
use header::locate_header;
use raw_table::{Cell, Table};
use record::{ColumnIndex, Record, TextField};

/// Result of cleaning one sheet.
#[derive(Debug)]
pub struct CleanOutcome {
    /// Absolute index of the detected header row.
    pub header_row: usize,
    /// Non-blank data rows below the header.
    pub source_rows: usize,
    pub records: Vec<Record>,
    /// Rows with an invalid sentinel in a validated text field.
    pub dropped_invalid: usize,
    /// Rows whose canonical client is block-listed.
    pub dropped_blocked: usize,
    /// Rows whose product normalized to nothing.
    pub dropped_product: usize,
}

/// Raw sheet rows → classified records.
///
/// - Locates the header row with the dataset's signature (fatal if absent).
/// - Normalizes column keys, then every mapped text field.
/// - Drops rows with invalid sentinels, block-listed clients or, when the
///   product rules ask for it, no usable product.
/// - Coerces counts (→ 0), year and date (→ `None`) and classifies the target.
#[tracing::instrument(level = "info", skip(rows, cfg), fields(dataset = ?cfg.kind, rows = rows.len()))]
pub fn clean_rows(rows: Vec<Vec<Cell>>, cfg: &DatasetConfig) -> Result<CleanOutcome, PipelineError> {
    let header_row = locate_header(&rows, &cfg.header_signature)?;
    info!(header_row, "header row found");

    let table = Table::from_header(rows, header_row, cfg.column_keys);
    let columns = ColumnIndex::resolve(&table, cfg)?;
    debug!(columns = ?table.columns, "normalized column keys");

    let classifier = Classifier::from_config(&cfg.category_rules);
    let aliaser = EntityAliaser::new(cfg.alias_rules.clone());

    let mut outcome = CleanOutcome {
        header_row,
        source_rows: table.rows.len(),
        records: Vec::with_capacity(table.rows.len()),
        dropped_invalid: 0,
        dropped_blocked: 0,
        dropped_product: 0,
    };

    for row in &table.rows {
        let mut text: BTreeMap<TextField, Option<String>> = TextField::ALL
            .iter()
            .map(|f| (*f, utils::normalize_text(columns.text_cell(row, *f))))
            .collect();

        let invalid = cfg.validated_fields.iter().any(|f| {
            text.get(f)
                .and_then(|v| v.as_deref())
                .is_some_and(|v| cfg.invalid_values.iter().any(|bad| bad == v))
        });
        if invalid {
            outcome.dropped_invalid += 1;
            continue;
        }

        let client = aliaser.canonicalize(text.remove(&TextField::Client).flatten().as_deref());
        if aliaser.is_blocked(client.as_deref()) {
            outcome.dropped_blocked += 1;
            continue;
        }

        let mut product = text.remove(&TextField::Product).flatten();
        if let Some(rules) = &cfg.product_rules {
            product = rules.normalize(product.as_deref());
            if product.is_none() && rules.drop_missing {
                outcome.dropped_product += 1;
                continue;
            }
        }

        let target_raw = text.remove(&TextField::Target).flatten();
        let target_category = classifier.classify(target_raw.as_deref()).to_string();

        let counts = columns
            .counts
            .iter()
            .map(|(key, idx)| (key.clone(), convert::coerce_count(Table::cell(row, *idx))))
            .collect();

        outcome.records.push(Record {
            site: text.remove(&TextField::Site).flatten(),
            packhouse: text.remove(&TextField::Packhouse).flatten(),
            client,
            country: text.remove(&TextField::Country).flatten(),
            destination_port: text.remove(&TextField::DestinationPort).flatten(),
            product,
            target_raw,
            target_category,
            year: convert::coerce_year(Table::cell(row, columns.year)),
            date: date_parser::coerce_date(Table::cell(row, columns.date)),
            counts,
        });
    }

    info!(
        kept = outcome.records.len(),
        source_rows = outcome.source_rows,
        dropped_invalid = outcome.dropped_invalid,
        dropped_blocked = outcome.dropped_blocked,
        dropped_product = outcome.dropped_product,
        "cleaning finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatasetConfig, ReportConfig};
    use crate::report::aggregate::filter_year;
    use chrono::NaiveDate;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,phytoreport::process=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn t(s: &str) -> Cell {
        Cell::text(s)
    }

    fn exit_port_sheet() -> Vec<Vec<Cell>> {
        let header = [
            "Fecha",
            "Año",
            "Predio",
            "Poscosecha Proceso",
            "País",
            "Cliente",
            "Producto",
            "Blanco Biológico",
            "Total Tallos Rechazados",
        ];
        vec![
            vec![t("INFORME DE INTERCEPTACIONES"), Cell::Empty],
            vec![Cell::Empty],
            vec![t("Corte:"), t("diciembre")],
            header.iter().map(|h| t(&h.to_uppercase())).collect(),
            vec![
                t("15/01/2025"),
                Cell::Number(2025.0),
                t("la esperanza"),
                t("POSCOSECHA NORTE"),
                t("Estados Unidos"),
                t("ABCO FLORES LTDA"),
                t("Rosa"),
                t("TRIPS EN HOJA"),
                Cell::Number(250.0),
            ],
            vec![
                t("03/02/2024"),
                Cell::Number(2024.0),
                t("El Rosal"),
                t("Poscosecha Sur"),
                t("Japón"),
                t("Flora Inc"),
                t("Clavel"),
                t("áfidos"),
                t("n/d"),
            ],
            vec![
                t("sin fecha"),
                t("2025"),
                t("N/A"),
                t("Poscosecha Sur"),
                t("Japón"),
                t("Flora Inc"),
                t("Clavel"),
                t("ácaros"),
                Cell::Number(10.0),
            ],
        ]
    }

    #[test]
    fn exit_port_end_to_end() {
        init_test_logging();
        let cfg = DatasetConfig::exit_port();
        let outcome = clean_rows(exit_port_sheet(), &cfg).unwrap();

        assert_eq!(outcome.header_row, 3);
        assert_eq!(outcome.source_rows, 3);
        assert_eq!(outcome.dropped_invalid, 1);
        assert_eq!(outcome.records.len(), 2);

        let first = &outcome.records[0];
        assert_eq!(first.target_category, "Trips");
        assert_eq!(first.target_raw.as_deref(), Some("Trips En Hoja"));
        assert_eq!(first.client.as_deref(), Some("Distribuidora Abco S.A"));
        assert_eq!(first.site.as_deref(), Some("La Esperanza"));
        assert_eq!(first.country.as_deref(), Some("Estados Unidos"));
        assert_eq!(first.year, Some(2025));
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 1, 15));
        assert_eq!(first.count("total_tallos_rechazados"), 250.0);
        assert_eq!(first.count("cuenta"), 0.0);

        let second = &outcome.records[1];
        assert_eq!(second.target_category, "Afidos");
        assert_eq!(second.country.as_deref(), Some("Japon"));
        assert_eq!(second.count("total_tallos_rechazados"), 0.0);

        let report_year = ReportConfig::default().report_year;
        let current = filter_year(&outcome.records, report_year);
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].target_category, "Trips");
    }

    #[test]
    fn missing_header_aborts() {
        let rows = vec![vec![t("Producto"), t("Cliente")], vec![t("Rosa"), t("X")]];
        let err = clean_rows(rows, &DatasetConfig::exit_port()).unwrap_err();
        assert!(matches!(err, PipelineError::HeaderNotFound { scanned: 2, .. }));
    }

    #[test]
    fn missing_target_column_aborts() {
        let rows = vec![
            vec![t("PRODUCTO"), t("AÑO")],
            vec![t("Rosa"), Cell::Number(2025.0)],
        ];
        let err = clean_rows(rows, &DatasetConfig::exit_port()).unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingColumn {
                column: "blanco_biologico".into(),
                header_row: 0
            }
        );
    }

    #[test]
    fn null_text_fields_are_not_sentinels() {
        let rows = vec![
            vec![t("PRODUCTO"), t("AÑO"), t("Blanco Biologico"), t("Predio")],
            vec![t("Rosa"), Cell::Number(2025.0), Cell::Empty, Cell::Empty],
        ];
        let outcome = clean_rows(rows, &DatasetConfig::exit_port()).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].site, None);
        assert_eq!(outcome.records[0].target_category, "OTROS");
    }

    #[test]
    fn whitespace_site_is_an_invalid_value() -> anyhow::Result<()> {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".csv").tempfile()?;
        write!(
            file,
            "PRODUCTO,AÑO,PREDIO,BLANCO BIOLOGICO\n\
             Rosa,2025,   ,Trips\n\
             Clavel,2025,El Rosal,Afidos\n"
        )?;

        let rows = crate::load::load_rows(file.path(), "ignored")?;
        let outcome = clean_rows(rows, &DatasetConfig::exit_port())?;
        assert_eq!(outcome.dropped_invalid, 1);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].site.as_deref(), Some("El Rosal"));
        Ok(())
    }

    #[test]
    fn destination_aliases_block_list_and_products() {
        let rows = vec![
            vec![t("Base de interceptaciones en destino")],
            vec![
                t("Interception Date"),
                t("Año"),
                t("Producto"),
                t("Puerto Destino"),
                t("Cliente"),
                t("Blanco Biolog."),
            ],
            vec![
                t("11/03/2025"),
                Cell::Number(2025.0),
                t("Rosa-Roja"),
                t("Amsterdam"),
                t("MM BV EUROPA"),
                t("Thrips sp."),
            ],
            vec![
                t("12/03/2025"),
                Cell::Number(2025.0),
                t("Clavel"),
                t("Miami"),
                t("NO INTERCEP."),
                t("Trips"),
            ],
            vec![
                t("13/03/2025"),
                Cell::Number(2025.0),
                t("no identificado"),
                t("Miami"),
                t("Sunburst Farms Elite"),
                t("cochinilla"),
            ],
            vec![
                t("14/03/2025"),
                t("dos mil"),
                t("Alstroemeria - Blanca"),
                t("Tokio"),
                t("Sunburst Farms (Elite)"),
                Cell::Empty,
            ],
        ];
        let outcome = clean_rows(rows, &DatasetConfig::destination()).unwrap();

        assert_eq!(outcome.header_row, 1);
        assert_eq!(outcome.dropped_blocked, 1);
        assert_eq!(outcome.dropped_product, 1);
        assert_eq!(outcome.records.len(), 2);

        let rosa = &outcome.records[0];
        assert_eq!(rosa.product.as_deref(), Some("Rosa"));
        assert_eq!(rosa.client.as_deref(), Some("MM Flower BV Europe"));
        assert_eq!(rosa.destination_port.as_deref(), Some("Amsterdam"));
        assert_eq!(rosa.target_category, "Thysanoptera");
        assert_eq!(rosa.date, NaiveDate::from_ymd_opt(2025, 3, 11));

        let alstro = &outcome.records[1];
        assert_eq!(alstro.product.as_deref(), Some("Alstroemeria"));
        assert_eq!(alstro.client.as_deref(), Some("Sunburst Farms"));
        assert_eq!(alstro.year, None);
        assert_eq!(alstro.target_category, "No especificado");
    }
}
