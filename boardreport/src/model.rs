use std::cmp::Ordering;

use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
    Error,
}

impl Outcome {
    /// Lenient mapping of runner outcome strings. Anything unknown counts as
    /// an error so it is never silently reported as a pass.
    pub fn from_label(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "passed" | "pass" | "ok" | "success" | "xpassed" => Self::Passed,
            "failed" | "fail" | "failure" => Self::Failed,
            "skipped" | "skip" | "pending" | "xfailed" | "ignored" | "deselected" => {
                Self::Skipped
            }
            _ => Self::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    pub name: String,
    pub outcome: Outcome,
    pub message: Option<String>,
    pub duration_secs: Option<f64>,
}

impl TestCase {
    pub(crate) fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then(self.outcome.cmp(&other.outcome))
            .then_with(|| self.message.cmp(&other.message))
            .then_with(|| cmp_optional_f64(self.duration_secs, other.duration_secs))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TestCounts {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub error: u64,
}

impl TestCounts {
    pub fn tally<'a>(cases: impl IntoIterator<Item = &'a TestCase>) -> Self {
        cases.into_iter().fold(Self::default(), |mut counts, case| {
            counts.total += 1;
            match case.outcome {
                Outcome::Passed => counts.passed += 1,
                Outcome::Failed => counts.failed += 1,
                Outcome::Skipped => counts.skipped += 1,
                Outcome::Error => counts.error += 1,
            }
            counts
        })
    }

    /// Counts reported without per-case detail. `total` is taken as given
    /// unless it is smaller than the categories it must contain.
    pub fn from_reported(
        total: Option<u64>,
        passed: u64,
        failed: u64,
        skipped: u64,
        error: u64,
    ) -> Self {
        let categorized = passed + failed + skipped + error;
        Self {
            total: total.unwrap_or(categorized).max(categorized),
            passed,
            failed,
            skipped,
            error,
        }
    }

    pub fn add(self, other: Self) -> Self {
        Self {
            total: self.total + other.total,
            passed: self.passed + other.passed,
            failed: self.failed + other.failed,
            skipped: self.skipped + other.skipped,
            error: self.error + other.error,
        }
    }

    pub fn has_meaningful_results(&self) -> bool {
        self.passed > 0 || self.failed > 0 || self.error > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceMeta {
    pub artifact: String,
    pub board: String,
    pub suite: String,
    pub timestamp: Option<String>,
}

impl SourceMeta {
    pub fn new(artifact: &str, board: &str, suite: &str) -> Self {
        Self {
            artifact: artifact.to_string(),
            board: board.to_string(),
            suite: suite.to_string(),
            timestamp: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResultSet {
    pub source: SourceMeta,
    pub counts: TestCounts,
    pub cases: Vec<TestCase>,
    /// Wall time of the run in seconds: the suite or report figure when the
    /// producer wrote one, else the sum of case durations.
    pub duration_secs: f64,
}

impl TestResultSet {
    pub fn from_cases(source: SourceMeta, cases: Vec<TestCase>) -> Self {
        let counts = TestCounts::tally(&cases);
        let duration_secs = cases
            .iter()
            .filter_map(|case| case.duration_secs)
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .sum();
        Self {
            source,
            counts,
            cases,
            duration_secs,
        }
    }

    pub fn from_counts(source: SourceMeta, counts: TestCounts) -> Self {
        Self {
            source,
            counts,
            cases: vec![],
            duration_secs: 0.0,
        }
    }

    /// Prefers a duration the producer reported for the whole run.
    pub fn with_reported_duration(mut self, reported: Option<f64>) -> Self {
        if let Some(secs) = reported.filter(|secs| secs.is_finite() && *secs >= 0.0) {
            self.duration_secs = secs;
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

/// Signed relative change from before to after, in percent. Presentation
/// (arrows, "degradation" wording) belongs to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Percent(f64),
    Undefined,
}

impl Impact {
    pub fn percent(self) -> Option<f64> {
        match self {
            Self::Percent(value) => Some(value),
            Self::Undefined => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetric {
    pub name: String,
    pub before: f64,
    pub after: f64,
    pub threshold: f64,
    pub verdict: Verdict,
    pub impact: Impact,
    pub reported_status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TestIdentity {
    pub test_path: String,
    pub class_name: String,
    pub parameters: Option<String>,
    pub timestamp: Option<String>,
    pub executed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSet {
    pub source: SourceMeta,
    pub test: TestIdentity,
    pub metrics: Vec<PerformanceMetric>,
}

impl MetricSet {
    pub fn passed(&self) -> u64 {
        self.count_verdict(Verdict::Pass)
    }

    pub fn failed(&self) -> u64 {
        self.count_verdict(Verdict::Fail)
    }

    fn count_verdict(&self, verdict: Verdict) -> u64 {
        self.metrics.iter().filter(|m| m.verdict == verdict).count() as u64
    }

    pub(crate) fn canonical_cmp(&self, other: &Self) -> Ordering {
        self.source
            .artifact
            .cmp(&other.source.artifact)
            .then_with(|| self.test.test_path.cmp(&other.test.test_path))
            .then_with(|| self.test.timestamp.cmp(&other.test.timestamp))
            .then_with(|| self.test.executed_at.cmp(&other.test.executed_at))
            .then_with(|| self.test.class_name.cmp(&other.test.class_name))
            .then_with(|| self.test.parameters.cmp(&other.test.parameters))
            .then_with(|| self.metrics.len().cmp(&other.metrics.len()))
            .then_with(|| {
                self.metrics
                    .iter()
                    .zip(other.metrics.iter())
                    .map(|(left, right)| {
                        left.name
                            .cmp(&right.name)
                            .then(left.before.total_cmp(&right.before))
                            .then(left.after.total_cmp(&right.after))
                            .then(left.threshold.total_cmp(&right.threshold))
                            .then_with(|| left.reported_status.cmp(&right.reported_status))
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            })
    }
}

/// What one recognized artifact contributed.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactResults {
    Tests(TestResultSet),
    Metrics(Vec<MetricSet>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedArtifact {
    pub results: ArtifactResults,
    /// Rows dropped inside an otherwise usable artifact.
    pub skipped_rows: Vec<crate::error::ParseError>,
}

impl ParsedArtifact {
    pub fn tests(set: TestResultSet) -> Self {
        Self {
            results: ArtifactResults::Tests(set),
            skipped_rows: vec![],
        }
    }
}

fn cmp_optional_f64(left: Option<f64>, right: Option<f64>) -> Ordering {
    match (left, right) {
        (Some(l), Some(r)) => l.total_cmp(&r),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
