use serde::Serialize;

use crate::aggregate::{Aggregator, ConsolidatedSummary};
use crate::config::ReportConfig;
use crate::detect::{ArtifactFormat, FormatDetector};
use crate::error::{ParseError, ReportError};
use crate::model::{ArtifactResults, ParsedArtifact, SourceMeta};
use crate::parse::{ParseOptions, parse_artifact};

/// One artifact as handed over by whatever fetched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactInput {
    pub filename: String,
    pub board: String,
    pub suite: String,
    pub content: Vec<u8>,
}

impl ArtifactInput {
    pub fn new(filename: &str, board: &str, suite: &str, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.to_string(),
            board: board.to_string(),
            suite: suite.to_string(),
            content: content.into(),
        }
    }

    fn source(&self) -> SourceMeta {
        SourceMeta::new(&self.filename, &self.board, &self.suite)
    }
}

/// The outcome of running one artifact through detection and parsing,
/// before anything is merged.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactOutcome {
    Unrecognized,
    Parsed {
        format: ArtifactFormat,
        artifact: ParsedArtifact,
    },
    Failed {
        format: ArtifactFormat,
        error: ParseError,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub seen: u64,
    pub parsed: u64,
    pub unrecognized: u64,
    pub failed: u64,
    pub skipped_rows: u64,
    pub dropped_skipped_only: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactIssue {
    pub artifact: String,
    pub board: String,
    pub suite: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub summary: ConsolidatedSummary,
    pub stats: BatchStats,
    pub issues: Vec<ArtifactIssue>,
}

/// Per-run state: the detector and parse options derived from config, the
/// aggregator, and the observability counters. Only fully parsed artifacts
/// reach the aggregator.
#[derive(Debug)]
pub struct BatchContext {
    detector: FormatDetector,
    options: ParseOptions,
    drop_skipped_only_suites: bool,
    critical_issue_sample_limit: usize,
    aggregator: Aggregator,
    stats: BatchStats,
    issues: Vec<ArtifactIssue>,
}

impl BatchContext {
    pub fn new(config: &ReportConfig) -> Result<Self, ReportError> {
        Ok(Self {
            detector: config.detector()?,
            options: config.parse_options(),
            drop_skipped_only_suites: config.drop_skipped_only_suites(),
            critical_issue_sample_limit: config.critical_issue_sample_limit(),
            aggregator: Aggregator::new(),
            stats: BatchStats::default(),
            issues: vec![],
        })
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    /// Detection and parsing only; touches no batch state.
    pub fn parse(&self, input: &ArtifactInput) -> ArtifactOutcome {
        parse_one(&self.detector, &self.options, input)
    }

    pub fn ingest(&mut self, input: &ArtifactInput) {
        let outcome = self.parse(input);
        self.record(input, outcome);
    }

    pub fn record(&mut self, input: &ArtifactInput, outcome: ArtifactOutcome) {
        self.stats.seen += 1;
        match outcome {
            ArtifactOutcome::Unrecognized => {
                self.stats.unrecognized += 1;
                tracing::info!(
                    artifact = %input.filename,
                    board = %input.board,
                    suite = %input.suite,
                    "skipping unrecognized artifact"
                );
            }
            ArtifactOutcome::Failed { format, error } => {
                self.stats.failed += 1;
                tracing::warn!(
                    artifact = %input.filename,
                    board = %input.board,
                    suite = %input.suite,
                    %format,
                    error = %error,
                    "artifact failed to parse; excluded from totals"
                );
                self.push_issue(input, &error);
            }
            ArtifactOutcome::Parsed { format, artifact } => {
                self.stats.skipped_rows += artifact.skipped_rows.len() as u64;
                artifact
                    .skipped_rows
                    .iter()
                    .for_each(|error| self.push_issue(input, error));
                if self.is_skipped_only(&artifact.results) {
                    self.stats.dropped_skipped_only += 1;
                    tracing::info!(
                        artifact = %input.filename,
                        %format,
                        "dropping result set with only skipped tests"
                    );
                    return;
                }
                self.stats.parsed += 1;
                self.aggregator.merge(&input.board, &input.suite, artifact.results);
            }
        }
    }

    /// An artifact whose bytes never arrived counts as seen and failed.
    pub fn record_unreadable(&mut self, input: &ArtifactInput, error: &ReportError) {
        self.stats.seen += 1;
        self.stats.failed += 1;
        tracing::warn!(
            artifact = %input.filename,
            board = %input.board,
            suite = %input.suite,
            error = %error,
            "unreadable artifact; excluded from totals"
        );
        self.push_issue(input, error);
    }

    fn is_skipped_only(&self, results: &ArtifactResults) -> bool {
        match results {
            ArtifactResults::Tests(set) => {
                self.drop_skipped_only_suites && !set.counts.has_meaningful_results()
            }
            ArtifactResults::Metrics(_) => false,
        }
    }

    fn push_issue(&mut self, input: &ArtifactInput, error: &impl std::fmt::Display) {
        self.issues.push(ArtifactIssue {
            artifact: input.filename.clone(),
            board: input.board.clone(),
            suite: input.suite.clone(),
            error: error.to_string(),
        });
    }

    pub fn finish(self) -> BatchReport {
        let mut issues = self.issues;
        issues.sort_by(|a, b| {
            (&a.board, &a.suite, &a.artifact, &a.error)
                .cmp(&(&b.board, &b.suite, &b.artifact, &b.error))
        });
        BatchReport {
            summary: self.aggregator.finish(self.critical_issue_sample_limit),
            stats: self.stats,
            issues,
        }
    }
}

fn parse_one(
    detector: &FormatDetector,
    options: &ParseOptions,
    input: &ArtifactInput,
) -> ArtifactOutcome {
    let format = detector.detect(&input.filename, &input.content);
    if format == ArtifactFormat::Unrecognized {
        return ArtifactOutcome::Unrecognized;
    }
    match parse_artifact(format, input.source(), &input.content, options) {
        Ok(artifact) => ArtifactOutcome::Parsed { format, artifact },
        Err(error) => ArtifactOutcome::Failed { format, error },
    }
}

/// Parses on a rayon pool of `jobs` threads, then merges on the calling
/// thread in input order.
pub fn parse_artifacts_parallel(
    ctx: &mut BatchContext,
    inputs: &[ArtifactInput],
    jobs: usize,
) -> Result<(), ReportError> {
    use rayon::prelude::*;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|err| ReportError::ThreadPool {
            message: err.to_string(),
        })?;
    let outcomes = {
        let ctx = &*ctx;
        pool.install(|| {
            inputs
                .par_iter()
                .map(|input| ctx.parse(input))
                .collect::<Vec<_>>()
        })
    };
    inputs
        .iter()
        .zip(outcomes)
        .for_each(|(input, outcome)| ctx.record(input, outcome));
    Ok(())
}

/// Sequential convenience over a full batch.
pub fn run_batch(
    config: &ReportConfig,
    inputs: &[ArtifactInput],
) -> Result<BatchReport, ReportError> {
    let mut ctx = BatchContext::new(config)?;
    inputs.iter().for_each(|input| ctx.ingest(input));
    Ok(ctx.finish())
}
