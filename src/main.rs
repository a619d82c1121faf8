use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use phytoreport::{
    clean_rows, load,
    report::{charts_for, console::render_summary},
    DatasetKind, ReportConfig,
};
use std::{
    fs::{self, File},
    io::BufWriter,
    path::PathBuf,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Which {
    ExitPort,
    Destination,
    All,
}

#[derive(Parser, Debug)]
#[command(name = "phytoreport")]
#[command(about = "Clean interception spreadsheets and build reporting tables and chart specs")]
struct Args {
    /// YAML configuration; built-in datasets when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for `<dataset>_charts.json`; charts are not written when omitted
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "all")]
    dataset: Which,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // ─── 2) configuration ────────────────────────────────────────────
    let cfg = match &args.config {
        Some(path) => ReportConfig::from_yaml_file(path)?,
        None => ReportConfig::default(),
    };
    info!(report_year = cfg.report_year, years = ?cfg.historical_years, "configuration ready");

    if let Some(dir) = &args.out_dir {
        fs::create_dir_all(dir).with_context(|| format!("creating output dir {:?}", dir))?;
    }

    let kinds: &[DatasetKind] = match args.dataset {
        Which::ExitPort => &[DatasetKind::ExitPort],
        Which::Destination => &[DatasetKind::Destination],
        Which::All => &[DatasetKind::ExitPort, DatasetKind::Destination],
    };

    // ─── 3) clean, summarize, chart each dataset ─────────────────────
    for kind in kinds {
        let dataset = cfg.dataset(*kind);
        info!(dataset = ?kind, source = %dataset.source_path.display(), "processing");

        let rows = load::load_rows(&dataset.source_path, &dataset.sheet_name)?;
        let outcome = clean_rows(rows, dataset)
            .with_context(|| format!("cleaning {}", dataset.source_path.display()))?;

        println!("\n=============== {:?} ===============", kind);
        print!("{}", render_summary(&outcome, &cfg, dataset));

        let charts = charts_for(&outcome.records, &cfg, dataset);
        match &args.out_dir {
            Some(dir) => {
                let name = match kind {
                    DatasetKind::ExitPort => "exit_port_charts.json",
                    DatasetKind::Destination => "destination_charts.json",
                };
                let path = dir.join(name);
                let file = File::create(&path)
                    .with_context(|| format!("creating chart file {:?}", path))?;
                serde_json::to_writer_pretty(BufWriter::new(file), &charts)
                    .with_context(|| format!("writing chart file {:?}", path))?;
                info!(charts = charts.len(), path = %path.display(), "chart specs written");
            }
            None => info!(charts = charts.len(), "no --out-dir; chart specs not written"),
        }
    }

    info!("all done");
    Ok(())
}
