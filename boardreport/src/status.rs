use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{MetricSet, Verdict};

pub const DEFAULT_CRITICAL_ISSUE_SAMPLE_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Excellent,
    Good,
    Warning,
    Critical,
}

impl HealthStatus {
    /// Bands are inclusive on their lower bound. NaN is treated as zero.
    pub fn classify(success_rate: f64) -> Self {
        let rate = if success_rate.is_nan() { 0.0 } else { success_rate };
        if rate >= 0.95 {
            Self::Excellent
        } else if rate >= 0.90 {
            Self::Good
        } else if rate >= 0.80 {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

/// `passed / total`, or 0 for an empty total.
pub fn success_rate(passed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueSample {
    pub board: String,
    pub suite: String,
    pub value: f64,
    pub threshold: f64,
}

impl IssueSample {
    fn overshoot(&self) -> f64 {
        self.value - self.threshold
    }

    fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .overshoot()
            .total_cmp(&self.overshoot())
            .then_with(|| self.board.cmp(&other.board))
            .then_with(|| self.suite.cmp(&other.suite))
            .then_with(|| self.value.total_cmp(&other.value))
            .then_with(|| self.threshold.total_cmp(&other.threshold))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalIssue {
    pub metric_name: String,
    pub failure_count: u64,
    pub samples: Vec<IssueSample>,
}

/// Groups every failing metric by its normalized name. Groups are ranked by
/// failure count, then name; each keeps at most `sample_limit` samples, the
/// furthest over threshold first.
pub fn rank_critical_issues<'a>(
    sets: impl IntoIterator<Item = &'a MetricSet>,
    sample_limit: usize,
) -> Vec<CriticalIssue> {
    let mut groups: BTreeMap<&str, Vec<IssueSample>> = BTreeMap::new();
    for set in sets {
        for metric in set.metrics.iter().filter(|m| m.verdict == Verdict::Fail) {
            groups
                .entry(metric.name.as_str())
                .or_default()
                .push(IssueSample {
                    board: set.source.board.clone(),
                    suite: set.source.suite.clone(),
                    value: metric.after,
                    threshold: metric.threshold,
                });
        }
    }

    let mut issues = groups
        .into_iter()
        .map(|(name, mut samples)| {
            samples.sort_by(IssueSample::rank_cmp);
            let failure_count = samples.len() as u64;
            samples.truncate(sample_limit);
            CriticalIssue {
                metric_name: name.to_string(),
                failure_count,
                samples,
            }
        })
        .collect::<Vec<_>>();
    issues.sort_by(|a, b| {
        b.failure_count
            .cmp(&a.failure_count)
            .then_with(|| a.metric_name.cmp(&b.metric_name))
    });
    issues
}
