//! Reporting tables, chart specifications and console summaries built from
//! cleaned records.

pub mod aggregate;
pub mod charts;
pub mod console;

pub use aggregate::{Dimension, ReportRow, ReportingTable, COUNT_COLUMN};
pub use charts::{charts_for, ChartKind, ChartSpec};
