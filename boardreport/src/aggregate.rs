use std::collections::BTreeMap;

use serde::Serialize;

use crate::labels::board_display_name;
use crate::model::{ArtifactResults, MetricSet, TestCase, TestCounts, TestResultSet};
use crate::status::{CriticalIssue, HealthStatus, rank_critical_issues, success_rate};

/// Rolled-up counters shared by every summary level. Tests and metrics are
/// kept apart; the success rate counts both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub total_tests: u64,
    pub passed_tests: u64,
    pub failed_tests: u64,
    pub skipped_tests: u64,
    pub error_tests: u64,
    pub total_metrics: u64,
    pub passed_metrics: u64,
    pub failed_metrics: u64,
    pub metric_set_count: u64,
    pub duration_secs: f64,
}

impl Totals {
    pub fn from_tests(counts: TestCounts) -> Self {
        Self {
            total_tests: counts.total,
            passed_tests: counts.passed,
            failed_tests: counts.failed,
            skipped_tests: counts.skipped,
            error_tests: counts.error,
            ..Self::default()
        }
    }

    pub fn from_metric_set(set: &MetricSet) -> Self {
        Self {
            total_metrics: set.metrics.len() as u64,
            passed_metrics: set.passed(),
            failed_metrics: set.failed(),
            metric_set_count: 1,
            ..Self::default()
        }
    }

    pub fn add(self, other: Self) -> Self {
        Self {
            total_tests: self.total_tests + other.total_tests,
            passed_tests: self.passed_tests + other.passed_tests,
            failed_tests: self.failed_tests + other.failed_tests,
            skipped_tests: self.skipped_tests + other.skipped_tests,
            error_tests: self.error_tests + other.error_tests,
            total_metrics: self.total_metrics + other.total_metrics,
            passed_metrics: self.passed_metrics + other.passed_metrics,
            failed_metrics: self.failed_metrics + other.failed_metrics,
            metric_set_count: self.metric_set_count + other.metric_set_count,
            duration_secs: self.duration_secs + other.duration_secs,
        }
    }

    pub fn success_rate(&self) -> f64 {
        success_rate(
            self.passed_tests + self.passed_metrics,
            self.total_tests + self.total_metrics,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteSummary {
    pub board: String,
    pub suite: String,
    #[serde(flatten)]
    pub totals: Totals,
    pub success_rate: f64,
    pub status: HealthStatus,
    pub cases: Vec<TestCase>,
    pub metric_sets: Vec<MetricSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardSummary {
    pub board: String,
    pub display_name: String,
    pub suite_count: u64,
    #[serde(flatten)]
    pub totals: Totals,
    pub success_rate: f64,
    pub status: HealthStatus,
    pub suites: Vec<SuiteSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidatedSummary {
    pub board_count: u64,
    pub suite_count: u64,
    #[serde(flatten)]
    pub totals: Totals,
    pub overall_success_rate: f64,
    pub status: HealthStatus,
    pub boards: Vec<BoardSummary>,
    pub critical_issues: Vec<CriticalIssue>,
}

#[derive(Debug, Default)]
struct SuiteAccumulator {
    totals: Totals,
    cases: Vec<TestCase>,
    metric_sets: Vec<MetricSet>,
    durations: Vec<f64>,
}

/// Accumulates fully parsed artifacts keyed by (board, suite). Merging is
/// commutative: `finish` sorts everything it concatenated, so the summary
/// does not depend on the order artifacts arrived in.
#[derive(Debug, Default)]
pub struct Aggregator {
    suites: BTreeMap<(String, String), SuiteAccumulator>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    pub fn merge(&mut self, board: &str, suite: &str, results: ArtifactResults) {
        match results {
            ArtifactResults::Tests(set) => self.merge_tests(board, suite, set),
            ArtifactResults::Metrics(sets) => sets
                .into_iter()
                .for_each(|set| self.merge_metrics(board, suite, set)),
        }
    }

    pub fn merge_tests(&mut self, board: &str, suite: &str, set: TestResultSet) {
        let acc = self.entry(board, suite);
        acc.totals = acc.totals.add(Totals::from_tests(set.counts));
        acc.durations.push(set.duration_secs);
        acc.cases.extend(set.cases);
    }

    pub fn merge_metrics(&mut self, board: &str, suite: &str, set: MetricSet) {
        let acc = self.entry(board, suite);
        acc.totals = acc.totals.add(Totals::from_metric_set(&set));
        acc.metric_sets.push(set);
    }

    fn entry(&mut self, board: &str, suite: &str) -> &mut SuiteAccumulator {
        self.suites
            .entry((board.to_string(), suite.to_string()))
            .or_default()
    }

    pub fn finish(self, critical_issue_sample_limit: usize) -> ConsolidatedSummary {
        let mut boards: BTreeMap<String, Vec<SuiteSummary>> = BTreeMap::new();
        for ((board, suite), acc) in self.suites {
            let summary = finish_suite(board.clone(), suite, acc);
            boards.entry(board).or_default().push(summary);
        }

        let boards = boards
            .into_iter()
            .map(|(board, suites)| finish_board(board, suites))
            .collect::<Vec<_>>();
        let critical_issues = rank_critical_issues(
            boards
                .iter()
                .flat_map(|board| board.suites.iter())
                .flat_map(|suite| suite.metric_sets.iter()),
            critical_issue_sample_limit,
        );
        let totals = boards
            .iter()
            .fold(Totals::default(), |acc, board| acc.add(board.totals));
        let overall_success_rate = totals.success_rate();

        ConsolidatedSummary {
            board_count: boards.len() as u64,
            suite_count: boards.iter().map(|board| board.suite_count).sum(),
            totals,
            overall_success_rate,
            status: HealthStatus::classify(overall_success_rate),
            boards,
            critical_issues,
        }
    }
}

fn finish_suite(board: String, suite: String, mut acc: SuiteAccumulator) -> SuiteSummary {
    acc.cases.sort_by(TestCase::canonical_cmp);
    acc.metric_sets.sort_by(MetricSet::canonical_cmp);
    // Summed in a fixed order so the float total does not depend on arrival order.
    acc.durations.sort_by(f64::total_cmp);
    acc.totals.duration_secs = acc.durations.iter().sum();
    let success_rate = acc.totals.success_rate();
    SuiteSummary {
        board,
        suite,
        totals: acc.totals,
        success_rate,
        status: HealthStatus::classify(success_rate),
        cases: acc.cases,
        metric_sets: acc.metric_sets,
    }
}

fn finish_board(board: String, suites: Vec<SuiteSummary>) -> BoardSummary {
    let totals = suites
        .iter()
        .fold(Totals::default(), |acc, suite| acc.add(suite.totals));
    let success_rate = totals.success_rate();
    BoardSummary {
        display_name: board_display_name(&board),
        board,
        suite_count: suites.len() as u64,
        totals,
        success_rate,
        status: HealthStatus::classify(success_rate),
        suites,
    }
}
