use crate::normalize::{NameRules, PrefixRule, TRUNCATION_MARKER, parse_title, truncate_message};

#[test]
fn default_rules_strip_both_blr_spellings() {
    let rules = NameRules::default();
    assert_eq!(rules.apply("  BLR statistics for heap%  "), "heap%");
    assert_eq!(rules.apply("BLR statictics for tasker   loop us"), "tasker loop us");
    assert_eq!(rules.apply("cpu%"), "cpu%");
}

#[test]
fn rules_apply_in_order_with_replacements() {
    let rules = NameRules::new(vec![
        PrefixRule {
            prefix: "Stats: ".to_string(),
            replacement: String::new(),
        },
        PrefixRule {
            prefix: "mem ".to_string(),
            replacement: "memory ".to_string(),
        },
    ]);
    assert_eq!(rules.apply("Stats: mem free"), "memory free");
    assert_eq!(rules.apply("mem Stats: free"), "memory Stats: free");
}

#[test]
fn truncation_counts_characters_not_bytes() {
    assert_eq!(truncate_message("short", 10), "short");
    assert_eq!(truncate_message("ééééé", 5), "ééééé");
    assert_eq!(
        truncate_message("ééééééé", 3),
        format!("ééé{TRUNCATION_MARKER}")
    );
}

#[test]
fn title_splits_path_timestamp_and_parameters() {
    let prefixes = vec![r"px_green\tests\functional_test\".to_string()];
    let identity = parse_title(
        r"px_green\tests\functional_test\iot\test_sntp.py[wifi-2g] 08/12/2025, 10:11:12",
        &prefixes,
    );
    assert_eq!(identity.class_name, "test_sntp.py");
    assert_eq!(identity.parameters.as_deref(), Some("wifi-2g"));
    assert_eq!(identity.timestamp.as_deref(), Some("08/12/2025, 10:11:12"));
    assert_eq!(
        identity.executed_at.map(|at| at.to_string()),
        Some("2025-08-12 10:11:12".to_string())
    );
}

#[test]
fn title_without_recognizable_timestamp() {
    let identity = parse_title("tests/perf/test_boot.py nightly", &[]);
    assert_eq!(identity.class_name, "test_boot.py");
    assert_eq!(identity.timestamp.as_deref(), Some("nightly"));
    assert_eq!(identity.executed_at, None);
}
