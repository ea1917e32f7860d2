use crate::detect::{ArtifactFormat, FormatDetector, format_from_extension, sniff_content};

fn detector() -> FormatDetector {
    FormatDetector::with_default_patterns().unwrap()
}

#[test]
fn names_without_a_result_pattern_are_unrecognized() {
    let detector = detector();
    assert_eq!(detector.detect("build.log", b"<testsuite/>"), ArtifactFormat::Unrecognized);
    assert_eq!(detector.detect("coverage/lcov.info", b""), ArtifactFormat::Unrecognized);
    assert!(!detector.is_candidate_name("results/board.xml"));
}

#[test]
fn extension_selects_the_parser() {
    let detector = detector();
    assert_eq!(detector.detect("junit.xml", b""), ArtifactFormat::JunitXml);
    assert_eq!(detector.detect("Pytest-Report.JSON", b""), ArtifactFormat::JsonReport);
    assert_eq!(detector.detect("out/report.htm", b""), ArtifactFormat::HtmlReport);
    assert_eq!(
        detector.detect("BFT_h743zi_dev/suite_x/dynamic_performance_data.csv", b""),
        ArtifactFormat::PerformanceCsv
    );
}

#[test]
fn undecided_extension_sniffs_content() {
    let detector = detector();
    assert_eq!(
        detector.detect("test_output.txt", b"  <?xml version=\"1.0\"?><testsuites/>"),
        ArtifactFormat::JunitXml
    );
    assert_eq!(detector.detect("results", b"{\"total\": 1}"), ArtifactFormat::JsonReport);
    assert_eq!(
        detector.detect("report", b"<!DOCTYPE html><html></html>"),
        ArtifactFormat::HtmlReport
    );
    assert_eq!(detector.detect("test.log", b"PASSED 3"), ArtifactFormat::Unrecognized);
}

#[test]
fn custom_patterns_replace_defaults() {
    let detector = FormatDetector::new(&["nightly".to_string()]).unwrap();
    assert!(detector.is_candidate_name("NIGHTLY-run.xml"));
    assert!(!detector.is_candidate_name("junit.xml"));
}

#[test]
fn extension_and_sniff_helpers() {
    assert_eq!(format_from_extension("a/b/c.CSV"), Some(ArtifactFormat::PerformanceCsv));
    assert_eq!(format_from_extension("report"), None);
    assert_eq!(sniff_content(b"\xEF\xBB\xBF<testsuite>"), ArtifactFormat::JunitXml);
}
