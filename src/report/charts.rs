use serde::{Deserialize, Serialize};

use crate::config::{DatasetConfig, DatasetKind, ReportConfig};
use crate::process::record::Record;
use crate::report::aggregate::{
    count_by, filter_categories, filter_year, filter_years, order_categories, restrict_to,
    risk_matrix, stem_impact, top_by_total, top_values, value_counts, Dimension, ReportingTable,
    RiskMatrix, StemImpact, COUNT_COLUMN,
};

const LOST_UNITS_COLUMN: &str = "total_tallos_rechazados";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Donut,
    Bar,
    StackedBar,
    GroupedBar,
    Heatmap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

/// Pre-aggregated data behind one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartData {
    Counts(ReportingTable),
    Matrix(RiskMatrix),
    Impact(StemImpact),
}

/// Everything a renderer needs to draw one chart; no styling beyond palette.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub id: String,
    pub title: String,
    pub kind: ChartKind,
    pub x: String,
    pub y: String,
    pub color: Option<String>,
    pub orientation: Orientation,
    pub category_order: Option<Vec<String>>,
    pub palette: Vec<String>,
    pub data: ChartData,
}

impl ChartSpec {
    fn counts(id: &str, title: String, kind: ChartKind, table: ReportingTable, palette: &[String]) -> Self {
        let x = table
            .dimensions
            .first()
            .map(|d| d.column().to_string())
            .unwrap_or_default();
        let color = table.dimensions.get(1).map(|d| d.column().to_string());
        Self {
            id: id.to_string(),
            title,
            kind,
            x,
            y: COUNT_COLUMN.to_string(),
            color,
            orientation: Orientation::Vertical,
            category_order: None,
            palette: palette.to_vec(),
            data: ChartData::Counts(table),
        }
    }

    /// Count axis on x, categories on y.
    fn horizontal(mut self) -> Self {
        std::mem::swap(&mut self.x, &mut self.y);
        self.orientation = Orientation::Horizontal;
        self
    }

    fn with_order(mut self, order: &[String]) -> Self {
        if !order.is_empty() {
            self.category_order = Some(order.to_vec());
        }
        self
    }

    pub fn table(&self) -> Option<&ReportingTable> {
        match &self.data {
            ChartData::Counts(t) => Some(t),
            _ => None,
        }
    }
}

pub fn charts_for(records: &[Record], report: &ReportConfig, dataset: &DatasetConfig) -> Vec<ChartSpec> {
    match dataset.kind {
        DatasetKind::ExitPort => exit_port_charts(records, report, dataset),
        DatasetKind::Destination => destination_charts(records, report, dataset),
    }
}

fn year_span(years: &[i32]) -> String {
    match (years.first(), years.last()) {
        (Some(a), Some(b)) if a != b => format!("{}–{}", a, b),
        (Some(a), _) => a.to_string(),
        _ => String::new(),
    }
}

/// Exit-port sequence: distribution, per-site/packhouse/country/client
/// breakdowns for the report year, then the historical views.
pub fn exit_port_charts(records: &[Record], report: &ReportConfig, dataset: &DatasetConfig) -> Vec<ChartSpec> {
    let year = report.report_year;
    let palette = &dataset.palette;
    let order = &dataset.category_order;
    let current = filter_year(records, year);
    let mut charts = Vec::new();

    charts.push(ChartSpec::counts(
        "exit_distribution",
        format!("Distribución de Interceptaciones por Blanco Biológico – {}", year),
        ChartKind::Donut,
        value_counts(&current, Dimension::Category),
        palette,
    ));

    charts.push(ChartSpec::counts(
        "exit_by_site",
        format!("Interceptaciones {} por Predio y Blanco Biológico", year),
        ChartKind::StackedBar,
        count_by(&current, &[Dimension::Site, Dimension::Category]),
        palette,
    ));

    charts.push(ChartSpec::counts(
        "exit_by_packhouse",
        format!("Interceptaciones {} por Poscosecha y Blanco Biológico", year),
        ChartKind::StackedBar,
        count_by(&current, &[Dimension::Packhouse, Dimension::Category]),
        palette,
    ));

    let by_country = count_by(&current, &[Dimension::Country, Dimension::Category]);
    charts.push(
        ChartSpec::counts(
            "exit_by_country",
            format!("Interceptaciones {} por País Destino", year),
            ChartKind::StackedBar,
            if order.is_empty() { by_country } else { order_categories(&by_country, order) },
            palette,
        )
        .with_order(order),
    );

    // ranked over every category, drawn for the ordered ones
    let top_clients = top_values(&current, Dimension::Client, report.top_n);
    let by_client = restrict_to(
        &count_by(&current, &[Dimension::Client, Dimension::Category]),
        Dimension::Client,
        &top_clients,
    );
    charts.push(
        ChartSpec::counts(
            "exit_top_clients",
            format!("Top {} Clientes con Interceptaciones – {}", report.top_n, year),
            ChartKind::StackedBar,
            if order.is_empty() { by_client } else { order_categories(&by_client, order) },
            palette,
        )
        .with_order(order),
    );

    // historical views only cover the ordered categories
    let all: Vec<&Record> = records.iter().collect();
    let historical = filter_years(&all, &report.historical_years);
    let historical = if order.is_empty() {
        historical
    } else {
        filter_categories(&historical, order)
    };

    charts.push(ChartSpec::counts(
        "exit_annual_kpi",
        "Evolución Anual de Interceptaciones – Puerto de Salida".to_string(),
        ChartKind::GroupedBar,
        count_by(&historical, &[Dimension::Year, Dimension::Category]),
        palette,
    ));

    let sites_hist = count_by(&historical, &[Dimension::Site, Dimension::Category]);
    let sites_hist = if order.is_empty() { sites_hist } else { order_categories(&sites_hist, order) };
    charts.push(
        ChartSpec::counts(
            "exit_recurrent_sites",
            format!("Top {} Predios Reincidentes – Interceptaciones Históricas", report.top_n),
            ChartKind::StackedBar,
            top_by_total(&sites_hist, Dimension::Site, report.top_n),
            palette,
        )
        .with_order(order),
    );

    let clients_hist = count_by(&historical, &[Dimension::Client, Dimension::Category]);
    charts.push(ChartSpec::counts(
        "exit_recurrent_clients",
        format!("Top {} Clientes con Interceptaciones – Histórico", report.top_n),
        ChartKind::StackedBar,
        top_by_total(&clients_hist, Dimension::Client, report.top_n),
        palette,
    ));

    if !order.is_empty() {
        charts.push(ChartSpec {
            id: "exit_risk_matrix".to_string(),
            title: format!(
                "Matriz de Riesgo Sanitario por Predio – Puerto de Salida {}",
                year
            ),
            kind: ChartKind::Heatmap,
            x: Dimension::Category.column().to_string(),
            y: Dimension::Site.column().to_string(),
            color: Some(COUNT_COLUMN.to_string()),
            orientation: Orientation::Vertical,
            category_order: Some(order.clone()),
            palette: palette.clone(),
            data: ChartData::Matrix(risk_matrix(&current, order, report.risk_matrix_rows)),
        });
    }

    if let Some(exported) = dataset.exported_units {
        charts.push(ChartSpec {
            id: "exit_stem_impact".to_string(),
            title: format!(
                "Impacto de Interceptaciones en Tallos – Puerto de Salida {}",
                year
            ),
            kind: ChartKind::Bar,
            x: "categoria".to_string(),
            y: "tallos".to_string(),
            color: None,
            orientation: Orientation::Vertical,
            category_order: None,
            palette: palette.clone(),
            data: ChartData::Impact(stem_impact(&current, LOST_UNITS_COLUMN, exported)),
        });
    }

    charts
}

/// Destination sequence: distribution, history, then top ports, clients and
/// products for the report year.
pub fn destination_charts(records: &[Record], report: &ReportConfig, dataset: &DatasetConfig) -> Vec<ChartSpec> {
    let year = report.report_year;
    let n = report.top_n;
    let palette = &dataset.palette;
    let current = filter_year(records, year);
    let mut charts = Vec::new();

    let mut distribution = value_counts(&current, Dimension::Category);
    distribution.rows.reverse();
    charts.push(
        ChartSpec::counts(
            "destination_distribution",
            format!(
                "Distribución de Interceptaciones por Blanco Biológico – Destino {}",
                year
            ),
            ChartKind::Bar,
            distribution,
            palette,
        )
        .horizontal(),
    );

    let all: Vec<&Record> = records.iter().collect();
    let historical = filter_years(&all, &report.historical_years);
    charts.push(ChartSpec::counts(
        "destination_history",
        format!(
            "Evolución Histórica de Interceptaciones – Destino ({})",
            year_span(&report.historical_years)
        ),
        ChartKind::StackedBar,
        count_by(&historical, &[Dimension::Year, Dimension::Category]),
        palette,
    ));

    let breakdowns = [
        (
            Dimension::DestinationPort,
            "destination_top_ports",
            format!("Interceptaciones por País Destino – Top {} ({})", n, year),
            false,
        ),
        (
            Dimension::Client,
            "destination_top_clients",
            format!("Top {} Clientes con Interceptaciones – Destino {}", n, year),
            true,
        ),
        (
            Dimension::Product,
            "destination_top_products",
            format!("Top {} Productos con Interceptaciones – Destino {}", n, year),
            true,
        ),
    ];
    for (dim, id, title, horizontal) in breakdowns {
        let top = top_values(&current, dim, n);
        let table = restrict_to(&count_by(&current, &[dim, Dimension::Category]), dim, &top);
        let chart = ChartSpec::counts(id, title, ChartKind::StackedBar, table, palette);
        charts.push(if horizontal { chart.horizontal() } else { chart });
    }

    charts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::aggregate::tests::rec;

    fn exit_records() -> Vec<Record> {
        let mut v = vec![
            rec("Alfa", "C1", "Trips", 2025),
            rec("Alfa", "C1", "Trips", 2025),
            rec("Beta", "C2", "Afidos", 2025),
            rec("Beta", "C2", "Acaros", 2025),
            rec("Gama", "C3", "Trips", 2024),
            rec("Gama", "C3", "Afidos", 2019),
        ];
        v[0].country = Some("Japon".into());
        v[2].country = Some("Japon".into());
        v[3].country = Some("Holanda".into());
        v[0].counts.insert(LOST_UNITS_COLUMN.into(), 500.0);
        v
    }

    #[test]
    fn exit_sequence_is_fixed() {
        let report = ReportConfig::default();
        let charts = exit_port_charts(&exit_records(), &report, &report.exit_port);
        let ids: Vec<&str> = charts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "exit_distribution",
                "exit_by_site",
                "exit_by_packhouse",
                "exit_by_country",
                "exit_top_clients",
                "exit_annual_kpi",
                "exit_recurrent_sites",
                "exit_recurrent_clients",
                "exit_risk_matrix",
                "exit_stem_impact",
            ]
        );
        assert_eq!(charts[0].kind, ChartKind::Donut);
        assert_eq!(charts[0].y, "interceptaciones");
        assert_eq!(charts[0].table().unwrap().total(), 4);
    }

    #[test]
    fn country_chart_keeps_only_ordered_categories() {
        let report = ReportConfig::default();
        let charts = exit_port_charts(&exit_records(), &report, &report.exit_port);
        let country = charts.iter().find(|c| c.id == "exit_by_country").unwrap();
        let table = country.table().unwrap();
        assert!(table.rows.iter().all(|r| r.keys[1] == "Trips" || r.keys[1] == "Afidos"));
        assert_eq!(table.total(), 2);
        assert_eq!(
            country.category_order,
            Some(vec!["Trips".to_string(), "Afidos".to_string()])
        );
    }

    #[test]
    fn top_clients_rank_all_categories_but_draw_ordered_ones() {
        let report = ReportConfig {
            top_n: 1,
            ..ReportConfig::default()
        };
        let mut records = exit_records();
        // C2 leads only once its Acaros row is counted
        records.push(rec("Beta", "C2", "Acaros", 2025));
        let charts = exit_port_charts(&records, &report, &report.exit_port);
        let clients = charts.iter().find(|c| c.id == "exit_top_clients").unwrap();
        let table = clients.table().unwrap();
        assert!(table.rows.iter().all(|r| r.keys[0] == "C2"));
        assert_eq!(table.total(), 1);
        assert_eq!(table.count_for(&["C2", "Afidos"]), 1);
        assert_eq!(
            clients.category_order,
            Some(vec!["Trips".to_string(), "Afidos".to_string()])
        );
    }

    #[test]
    fn historical_kpi_covers_configured_years() {
        let report = ReportConfig::default();
        let charts = exit_port_charts(&exit_records(), &report, &report.exit_port);
        let kpi = charts.iter().find(|c| c.id == "exit_annual_kpi").unwrap();
        let table = kpi.table().unwrap();
        // 2019 is outside the window and Acaros is outside the category order
        assert_eq!(table.total(), 4);
        assert_eq!(table.count_for(&["2024", "Trips"]), 1);
    }

    #[test]
    fn stem_impact_chart_uses_report_year() {
        let report = ReportConfig::default();
        let charts = exit_port_charts(&exit_records(), &report, &report.exit_port);
        match &charts.last().unwrap().data {
            ChartData::Impact(impact) => {
                assert_eq!(impact.lost, 500.0);
                assert_eq!(impact.exported, 22_433_766.0);
            }
            other => panic!("unexpected chart data {:?}", other),
        }
    }

    #[test]
    fn destination_sequence_and_orientation() {
        let report = ReportConfig::default();
        let mut records = exit_records();
        for r in &mut records {
            r.destination_port = r.country.clone();
            r.product = Some("Rosa".into());
        }
        let charts = charts_for(&records, &report, &report.destination);
        let ids: Vec<&str> = charts.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "destination_distribution",
                "destination_history",
                "destination_top_ports",
                "destination_top_clients",
                "destination_top_products",
            ]
        );
        let dist = &charts[0];
        assert_eq!(dist.orientation, Orientation::Horizontal);
        assert_eq!(dist.x, "interceptaciones");
        let counts: Vec<u64> = dist.table().unwrap().rows.iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![1, 1, 2]);
        assert_eq!(
            charts[1].title,
            "Evolución Histórica de Interceptaciones – Destino (2023–2025)"
        );
    }

    #[test]
    fn chart_specs_serialize_to_json() {
        let report = ReportConfig::default();
        let charts = exit_port_charts(&exit_records(), &report, &report.exit_port);
        let json = serde_json::to_value(&charts).unwrap();
        assert_eq!(json[0]["kind"], "donut");
        assert_eq!(json[0]["data"]["type"], "counts");
        assert_eq!(json[8]["data"]["type"], "matrix");
    }
}
