use crate::evaluate::evaluate_metric;
use crate::model::{MetricSet, SourceMeta, TestIdentity};
use crate::status::{HealthStatus, rank_critical_issues, success_rate};

#[test]
fn bands_are_inclusive_on_their_lower_bound() {
    let cases = [
        (1.0, HealthStatus::Excellent),
        (0.95, HealthStatus::Excellent),
        (0.9499, HealthStatus::Good),
        (0.90, HealthStatus::Good),
        (0.8999, HealthStatus::Warning),
        (0.80, HealthStatus::Warning),
        (0.7999, HealthStatus::Critical),
        (0.0, HealthStatus::Critical),
    ];
    for (rate, expected) in cases {
        assert_eq!(HealthStatus::classify(rate), expected, "rate {rate}");
    }
}

#[test]
fn nan_rate_is_critical() {
    assert_eq!(HealthStatus::classify(f64::NAN), HealthStatus::Critical);
}

#[test]
fn empty_total_has_zero_rate() {
    assert_eq!(success_rate(0, 0), 0.0);
    assert_eq!(success_rate(3, 4), 0.75);
}

fn set(board: &str, suite: &str, metrics: &[(&str, f64, f64)]) -> MetricSet {
    MetricSet {
        source: SourceMeta::new("perf.csv", board, suite),
        test: TestIdentity::default(),
        metrics: metrics
            .iter()
            .map(|(name, after, threshold)| {
                evaluate_metric(name.to_string(), 1.0, *after, *threshold)
            })
            .collect(),
    }
}

#[test]
fn issues_rank_by_count_then_name() {
    let sets = [
        set("h743", "mqtt", &[("cpu%", 120.0, 100.0), ("heap%", 10.0, 100.0)]),
        set("u575", "mqtt", &[("cpu%", 101.0, 100.0), ("stack", 9.0, 8.0)]),
        set("u575", "ble", &[("alloc", 5.0, 4.0)]),
    ];

    let issues = rank_critical_issues(&sets, 3);

    let ranked = issues
        .iter()
        .map(|issue| (issue.metric_name.as_str(), issue.failure_count))
        .collect::<Vec<_>>();
    assert_eq!(ranked, vec![("cpu%", 2), ("alloc", 1), ("stack", 1)]);
}

#[test]
fn samples_are_capped_and_worst_first() {
    let sets = [
        set("a", "s1", &[("loop us", 260.0, 250.0)]),
        set("b", "s1", &[("loop us", 400.0, 250.0)]),
        set("c", "s1", &[("loop us", 300.0, 250.0)]),
        set("d", "s1", &[("loop us", 251.0, 250.0)]),
    ];

    let issues = rank_critical_issues(&sets, 2);

    assert_eq!(issues[0].failure_count, 4);
    let boards = issues[0]
        .samples
        .iter()
        .map(|sample| sample.board.as_str())
        .collect::<Vec<_>>();
    assert_eq!(boards, vec!["b", "c"]);
}
