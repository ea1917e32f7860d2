use crate::model::{Impact, PerformanceMetric, Verdict};

/// Fail iff `after` exceeds `threshold`; the boundary is a pass.
pub fn verdict(after: f64, threshold: f64) -> Verdict {
    if after > threshold {
        Verdict::Fail
    } else {
        Verdict::Pass
    }
}

pub fn impact(before: f64, after: f64) -> Impact {
    if before == 0.0 || !before.is_finite() || !after.is_finite() {
        return Impact::Undefined;
    }
    Impact::Percent(((after - before) / before) * 100.0)
}

pub fn evaluate_metric(name: String, before: f64, after: f64, threshold: f64) -> PerformanceMetric {
    PerformanceMetric {
        name,
        before,
        after,
        threshold,
        verdict: verdict(after, threshold),
        impact: impact(before, after),
        reported_status: None,
    }
}

/// Reads a producer's own Pass/Fail column, if it says anything recognizable.
pub fn reported_verdict(status: &str) -> Option<Verdict> {
    match status.trim().to_ascii_lowercase().as_str() {
        "pass" | "passed" | "ok" => Some(Verdict::Pass),
        "fail" | "failed" => Some(Verdict::Fail),
        _ => None,
    }
}
