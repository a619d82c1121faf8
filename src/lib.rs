pub mod classify;
pub mod config;
pub mod error;
pub mod load;
pub mod process;
pub mod report;

pub use config::{DatasetConfig, DatasetKind, ReportConfig};
pub use error::PipelineError;
pub use process::{clean_rows, CleanOutcome};
