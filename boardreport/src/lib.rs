pub mod aggregate;
pub mod batch;
pub mod config;
pub mod detect;
pub mod discover;
pub mod error;
pub mod evaluate;
pub mod labels;
pub mod model;
pub mod normalize;
pub mod parse;
pub mod status;

#[cfg(test)]
mod detect_test;
#[cfg(test)]
mod evaluate_test;
#[cfg(test)]
mod labels_test;
#[cfg(test)]
mod normalize_test;
#[cfg(test)]
mod status_test;

pub use aggregate::{Aggregator, BoardSummary, ConsolidatedSummary, SuiteSummary, Totals};
pub use batch::{
    ArtifactInput, ArtifactIssue, BatchContext, BatchReport, BatchStats, parse_artifacts_parallel,
    run_batch,
};
pub use config::{ReportConfig, load_report_config, load_report_config_from_path};
pub use detect::{ArtifactFormat, FormatDetector};
pub use error::{ParseError, ReportError};
pub use status::{CriticalIssue, HealthStatus, IssueSample};
