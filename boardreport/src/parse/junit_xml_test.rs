use crate::detect::ArtifactFormat;
use crate::error::ParseError;
use crate::model::{Outcome, SourceMeta, TestCounts};
use crate::normalize::TRUNCATION_MARKER;
use crate::parse::parse_junit_xml;

fn source() -> SourceMeta {
    SourceMeta::new("junit-results.xml", "h743", "smoke")
}

#[test]
fn counters_come_from_cases_not_root_attributes() {
    let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<testsuites tests="99" failures="0">
  <testsuite name="smoke" tests="99">
    <testcase classname="test_boot" name="test_ok" time="0.25"/>
    <testcase classname="test_boot" name="test_broken" time="1.5">
      <failure message="assert 1 == 2">AssertionError: assert 1 == 2</failure>
    </testcase>
    <testcase classname="test_boot" name="test_crash">
      <error message="fixture exploded"/>
    </testcase>
    <testcase classname="test_boot" name="test_later">
      <skipped message="no hardware"/>
    </testcase>
  </testsuite>
</testsuites>"#;

    let set = parse_junit_xml(xml, source(), 500).unwrap();

    assert_eq!(
        set.counts,
        TestCounts {
            total: 4,
            passed: 1,
            failed: 1,
            skipped: 1,
            error: 1,
        }
    );
    assert_eq!(set.counts, TestCounts::tally(&set.cases));
    assert_eq!(set.cases[0].name, "test_boot::test_ok");
    assert_eq!(set.cases[0].duration_secs, Some(0.25));
    assert_eq!(set.cases[1].outcome, Outcome::Failed);
    assert_eq!(
        set.cases[1].message.as_deref(),
        Some("AssertionError: assert 1 == 2")
    );
    assert_eq!(set.cases[2].message.as_deref(), Some("fixture exploded"));
    assert_eq!(set.cases[3].outcome, Outcome::Skipped);
    assert_eq!(set.cases[3].message, None);
}

#[test]
fn bare_testsuite_root_qualifies_names_with_suite() {
    let xml = r#"<testsuite name="pytest"><testcase name="test_a"/></testsuite>"#;
    let set = parse_junit_xml(xml, source(), 500).unwrap();
    assert_eq!(set.cases[0].name, "pytest::test_a");
    assert_eq!(set.counts.passed, 1);
}

#[test]
fn long_failure_text_is_truncated_with_marker() {
    let body = "x".repeat(40);
    let xml = format!(
        r#"<testsuite name="s"><testcase name="t"><failure>{body}</failure></testcase></testsuite>"#
    );
    let set = parse_junit_xml(&xml, source(), 10).unwrap();
    let message = set.cases[0].message.clone().unwrap();
    assert_eq!(message, format!("{}{TRUNCATION_MARKER}", "x".repeat(10)));
}

#[test]
fn failure_wins_over_an_earlier_skip() {
    let xml = r#"<testsuite name="s">
  <testcase name="t"><skipped/><failure message="late failure"/></testcase>
</testsuite>"#;
    let set = parse_junit_xml(xml, source(), 500).unwrap();
    assert_eq!(set.cases[0].outcome, Outcome::Failed);
    assert_eq!(set.cases[0].message.as_deref(), Some("late failure"));
}

#[test]
fn empty_suite_is_zero_tests() {
    let set = parse_junit_xml(r#"<testsuites></testsuites>"#, source(), 500).unwrap();
    assert_eq!(set.counts, TestCounts::default());
    assert!(set.cases.is_empty());
}

#[test]
fn unclosed_document_is_malformed_with_position() {
    let xml = "<testsuites>\n  <testsuite name=\"s\">\n    <testcase name=\"t\">";
    let err = parse_junit_xml(xml, source(), 500).unwrap_err();
    match err {
        ParseError::Malformed { format, line, .. } => {
            assert_eq!(format, ArtifactFormat::JunitXml);
            assert_eq!(line, Some(3));
        }
        other => panic!("expected malformed error, got {other:?}"),
    }
}

#[test]
fn mismatched_end_tag_is_malformed() {
    let xml = "<testsuites><testsuite name=\"s\"></testcase></testsuites>";
    let err = parse_junit_xml(xml, source(), 500).unwrap_err();
    assert!(err.is_malformed(), "{err:?}");
}

#[test]
fn foreign_root_is_a_schema_mismatch() {
    let err = parse_junit_xml("<coverage line-rate=\"1\"/>", source(), 500).unwrap_err();
    assert!(matches!(err, ParseError::SchemaMismatch { .. }), "{err:?}");
}

#[test]
fn duration_prefers_outer_suite_times_over_case_sum() {
    let xml = r#"<testsuites>
  <testsuite name="boot" time="3.5">
    <testsuite name="inner" time="1.0">
      <testcase name="a" time="0.5"/>
    </testsuite>
  </testsuite>
  <testsuite name="ble" time="2.0">
    <testcase name="b" time="0.25"/>
  </testsuite>
</testsuites>"#;
    let set = parse_junit_xml(xml, source(), 500).unwrap();
    assert_eq!(set.duration_secs, 5.5);

    let untimed = r#"<testsuite name="boot">
  <testcase name="a" time="0.5"/>
  <testcase name="b" time="0.25"/>
  <testcase name="c"/>
</testsuite>"#;
    let set = parse_junit_xml(untimed, source(), 500).unwrap();
    assert_eq!(set.duration_secs, 0.75);
}

#[test]
fn testsuites_time_wins_when_present() {
    let xml = r#"<testsuites time="9.0">
  <testsuite name="boot" time="3.0"><testcase name="a"/></testsuite>
</testsuites>"#;
    let set = parse_junit_xml(xml, source(), 500).unwrap();
    assert_eq!(set.duration_secs, 9.0);
}
