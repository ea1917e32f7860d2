use crate::evaluate::{evaluate_metric, impact, reported_verdict, verdict};
use crate::model::{Impact, Verdict};

#[test]
fn verdict_passes_at_the_threshold_and_fails_strictly_above() {
    assert_eq!(verdict(99.0, 100.0), Verdict::Pass);
    assert_eq!(verdict(100.0, 100.0), Verdict::Pass);
    assert_eq!(verdict(100.0001, 100.0), Verdict::Fail);
    assert_eq!(verdict(-5.0, 0.0), Verdict::Pass);
}

#[test]
fn verdict_ignores_before_value_and_impact() {
    let improved = evaluate_metric("cpu%".to_string(), 500.0, 120.0, 100.0);
    assert_eq!(improved.verdict, Verdict::Fail);

    let regressed = evaluate_metric("heap%".to_string(), 1.0, 90.0, 100.0);
    assert_eq!(regressed.verdict, Verdict::Pass);
    assert_eq!(regressed.impact, Impact::Percent(8900.0));
}

#[test]
fn impact_is_signed_percentage_of_before() {
    assert_eq!(impact(100.0, 150.0), Impact::Percent(50.0));
    assert_eq!(impact(100.0, 50.0), Impact::Percent(-50.0));
    assert_eq!(impact(100.0, 100.0), Impact::Percent(0.0));
}

#[test]
fn impact_is_undefined_when_before_is_zero() {
    assert_eq!(impact(0.0, 0.0), Impact::Undefined);
    assert_eq!(impact(0.0, 42.0), Impact::Undefined);
    assert_eq!(impact(-0.0, 42.0), Impact::Undefined);
    assert_eq!(impact(0.0, 42.0).percent(), None);
}

#[test]
fn reported_verdict_reads_common_spellings() {
    assert_eq!(reported_verdict(" PASS "), Some(Verdict::Pass));
    assert_eq!(reported_verdict("Failed"), Some(Verdict::Fail));
    assert_eq!(reported_verdict("n/a"), None);
}
