use prettytable::{format, Cell, Row, Table};
use std::fmt;

use crate::config::{DatasetConfig, DatasetKind, ReportConfig};
use crate::process::record::Record;
use crate::process::CleanOutcome;
use crate::report::aggregate::{
    count_by, filter_categories, filter_year, filter_years, stem_impact, value_counts,
    year_over_year, Dimension, ReportingTable, StemImpact, YearOverYear, COUNT_COLUMN,
};

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(Row::new(
        headers.iter().map(|h| Cell::new(h).style_spec("bFg")).collect(),
    ));
    table
}

/// One row per key combination, count right-aligned.
pub fn counts_table(table: &ReportingTable) -> Table {
    let mut headers: Vec<&str> = table.dimensions.iter().map(|d| d.column()).collect();
    headers.push(COUNT_COLUMN);
    let mut out = new_table(&headers);
    for row in &table.rows {
        let mut cells: Vec<Cell> = row.keys.iter().map(|k| Cell::new(k)).collect();
        cells.push(Cell::new(&row.count.to_string()).style_spec("r"));
        out.add_row(Row::new(cells));
    }
    out
}

pub fn year_over_year_table(rows: &[YearOverYear], years: &[i32]) -> Table {
    let year_labels: Vec<String> = years.iter().map(|y| y.to_string()).collect();
    let var_labels: Vec<String> = years
        .windows(2)
        .map(|w| format!("var_{}_{}_%", w[0] % 100, w[1] % 100))
        .collect();
    let mut headers: Vec<&str> = vec![Dimension::Category.column()];
    headers.extend(year_labels.iter().map(String::as_str));
    headers.extend(var_labels.iter().map(String::as_str));

    let mut out = new_table(&headers);
    for row in rows {
        let mut cells = vec![Cell::new(&row.category)];
        for y in years {
            let n = row.counts.get(y).copied().unwrap_or(0);
            cells.push(Cell::new(&n.to_string()).style_spec("r"));
        }
        for (_, pct) in &row.variations {
            cells.push(Cell::new(&format!("{:.1}", pct)).style_spec("r"));
        }
        out.add_row(Row::new(cells));
    }
    out
}

pub fn impact_table(impact: &StemImpact) -> Table {
    let mut out = new_table(&["categoria", "tallos"]);
    out.add_row(Row::new(vec![
        Cell::new("Exportados"),
        Cell::new(&thousands(impact.exported)).style_spec("r"),
    ]));
    out.add_row(Row::new(vec![
        Cell::new("Perdidos por Interceptaciones"),
        Cell::new(&thousands(impact.lost)).style_spec("r"),
    ]));
    out
}

/// `22433766.0` → `22,433,766`.
pub fn thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Console validation report for one cleaned dataset.
pub struct Summary<'a> {
    pub outcome: &'a CleanOutcome,
    pub report: &'a ReportConfig,
    pub dataset: &'a DatasetConfig,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (outcome, report, dataset) = (self.outcome, self.report, self.dataset);
        let year = report.report_year;
        let records: &[Record] = &outcome.records;
        let current = filter_year(records, year);

        writeln!(f, "Encabezados encontrados en la fila {}", outcome.header_row)?;
        writeln!(
            f,
            "Registros: {} leídos, {} válidos ({} inválidos, {} clientes excluidos, {} sin producto)",
            outcome.source_rows,
            records.len(),
            outcome.dropped_invalid,
            outcome.dropped_blocked,
            outcome.dropped_product
        )?;
        writeln!(f, "Total interceptaciones {}: {}", year, current.len())?;

        writeln!(f, "\nBlancos biológicos {}:", year)?;
        write!(f, "{}", counts_table(&value_counts(&current, Dimension::Category)))?;

        let all: Vec<&Record> = records.iter().collect();
        let historical = filter_years(&all, &report.historical_years);

        match dataset.kind {
            DatasetKind::ExitPort => {
                let historical = if dataset.category_order.is_empty() {
                    historical
                } else {
                    filter_categories(&historical, &dataset.category_order)
                };
                let kpi = count_by(&historical, &[Dimension::Year, Dimension::Category]);
                writeln!(f, "\nKPI histórico:")?;
                write!(f, "{}", counts_table(&kpi))?;

                let yoy = year_over_year(&kpi, &report.historical_years);
                writeln!(f, "\nVariación interanual (%):")?;
                write!(f, "{}", year_over_year_table(&yoy, &report.historical_years))?;

                if let Some(exported) = dataset.exported_units {
                    let impact = stem_impact(&current, "total_tallos_rechazados", exported);
                    writeln!(f, "\nImpacto productivo {}:", year)?;
                    write!(f, "{}", impact_table(&impact))?;
                    writeln!(f, "Pérdida porcentual: {:.4}%", impact.loss_pct)?;
                }
            }
            DatasetKind::Destination => {
                for (label, dim) in [
                    ("Top clientes", Dimension::Client),
                    ("Top productos", Dimension::Product),
                ] {
                    let mut table = value_counts(&current, dim);
                    table.rows.truncate(report.top_n);
                    writeln!(f, "\n{}:", label)?;
                    write!(f, "{}", counts_table(&table))?;
                }

                writeln!(f, "\nHistórico:")?;
                write!(
                    f,
                    "{}",
                    counts_table(&count_by(&historical, &[Dimension::Year, Dimension::Category]))
                )?;

                let mut ports = value_counts(&current, Dimension::DestinationPort);
                ports.rows.truncate(report.top_n);
                writeln!(f, "\nTop países destino {}:", year)?;
                write!(f, "{}", counts_table(&ports))?;
            }
        }
        Ok(())
    }
}

pub fn render_summary(outcome: &CleanOutcome, report: &ReportConfig, dataset: &DatasetConfig) -> String {
    Summary {
        outcome,
        report,
        dataset,
    }
    .to_string()
}
