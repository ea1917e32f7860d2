use crate::error::ParseError;
use crate::model::{Impact, SourceMeta, Verdict};
use crate::normalize::NameRules;
use crate::parse::{PerfCsvOutput, parse_perf_csv};

const HEADER: &str = "Class Name,Parameters,Before test execution Metrics,After test execution Metrics,Threshold Value,Status";

fn prefixes() -> Vec<String> {
    vec![r"px_green\tests\functional_test\".to_string()]
}

fn parse(csv: &str) -> PerfCsvOutput {
    let source = SourceMeta::new("dynamic_performance_data.csv", "h743", "perf");
    parse_perf_csv(csv, &source, &NameRules::default(), &prefixes())
}

#[test]
fn one_title_block_with_three_metrics() {
    let csv = format!(
        "{HEADER}\n\
\"px_green\\tests\\functional_test\\test_perf_mqtt.py 08/12/2025, 10:11:12\",,,,,\n\
,BLR statistics for heap%,6,8,100,Pass\n\
,cpu%,100,100,100,Pass\n\
,BLR statictics for tasker loop us,11431,343282,250000,Fail\n"
    );

    let PerfCsvOutput { sets, skipped_rows } = parse(&csv);

    assert!(skipped_rows.is_empty(), "{skipped_rows:?}");
    assert_eq!(sets.len(), 1);
    let set = &sets[0];
    assert_eq!(set.test.class_name, "test_perf_mqtt.py");
    assert_eq!(set.test.timestamp.as_deref(), Some("08/12/2025, 10:11:12"));
    assert_eq!(set.source.timestamp.as_deref(), Some("08/12/2025, 10:11:12"));
    assert!(set.test.executed_at.is_some());

    let names = set.metrics.iter().map(|m| m.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["heap%", "cpu%", "tasker loop us"]);
    assert_eq!(set.passed(), 2);
    assert_eq!(set.failed(), 1);
    assert_eq!(set.metrics[1].verdict, Verdict::Pass);
    assert_eq!(set.metrics[2].verdict, Verdict::Fail);
    assert_eq!(set.metrics[1].impact, Impact::Percent(0.0));
    assert_eq!(set.metrics[2].reported_status.as_deref(), Some("Fail"));
}

#[test]
fn unquoted_title_split_by_its_comma_is_rejoined() {
    let csv = format!(
        "{HEADER}\n\
test_boot.py[fast] 01/02/2025, 03:04:05\n\
,heap%,1,2,3,Pass\n"
    );
    let PerfCsvOutput { sets, .. } = parse(&csv);
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].test.class_name, "test_boot.py");
    assert_eq!(sets[0].test.parameters.as_deref(), Some("fast"));
    assert_eq!(sets[0].test.timestamp.as_deref(), Some("01/02/2025, 03:04:05"));
    assert_eq!(sets[0].metrics.len(), 1);
}

#[test]
fn non_numeric_row_is_skipped_alone() {
    let csv = format!(
        "{HEADER}\n\
\"a.py 08/12/2025, 10:11:12\"\n\
,heap%,N/A,8,100,Pass\n\
,cpu%,10,20,100,Pass\n"
    );
    let PerfCsvOutput { sets, skipped_rows } = parse(&csv);

    assert_eq!(sets[0].metrics.len(), 1);
    assert_eq!(sets[0].metrics[0].name, "cpu%");
    assert_eq!(
        skipped_rows,
        vec![ParseError::NumericField {
            line: 3,
            column: "before",
            value: "N/A".to_string(),
        }]
    );
}

#[test]
fn empty_blocks_are_kept() {
    let csv = format!(
        "{HEADER}\n\
\"a.py 08/12/2025, 10:11:12\"\n\
\"b.py 08/12/2025, 10:15:00\"\n\
,heap%,1,1,1,Pass\n"
    );
    let PerfCsvOutput { sets, .. } = parse(&csv);
    assert_eq!(sets.len(), 2);
    assert!(sets[0].metrics.is_empty());
    assert_eq!(sets[1].metrics.len(), 1);
}

#[test]
fn metric_rows_before_any_title_are_reported() {
    let csv = format!("{HEADER}\n,heap%,1,2,3,Pass\n");
    let PerfCsvOutput { sets, skipped_rows } = parse(&csv);
    assert!(sets.is_empty());
    assert_eq!(skipped_rows.len(), 1);
    assert!(skipped_rows[0].is_malformed());
}

#[test]
fn header_can_reorder_columns() {
    let csv = "Class Name,Parameters,Threshold Value,Before,After\n\
\"a.py 08/12/2025, 10:11:12\"\n\
,heap%,100,6,120\n";
    let PerfCsvOutput { sets, .. } = parse(csv);
    let metric = &sets[0].metrics[0];
    assert_eq!(metric.threshold, 100.0);
    assert_eq!(metric.before, 6.0);
    assert_eq!(metric.after, 120.0);
    assert_eq!(metric.verdict, Verdict::Fail);
    assert_eq!(metric.reported_status, None);
}

#[test]
fn class_name_beside_metric_values_is_reported_not_a_title() {
    let csv = format!(
        "{HEADER}\n\
\"a.py 08/12/2025, 10:11:12\"\n\
,heap%,1,2,3,Pass\n\
TestPerf,cpu%,10,500,100,Fail\n\
,stack,1,1,1,Pass\n"
    );
    let PerfCsvOutput { sets, skipped_rows } = parse(&csv);

    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].test.class_name, "a.py");
    let names = sets[0].metrics.iter().map(|m| m.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["heap%", "stack"]);

    assert_eq!(skipped_rows.len(), 1);
    match &skipped_rows[0] {
        ParseError::Malformed { line, .. } => assert_eq!(*line, Some(4)),
        other => panic!("expected malformed row, got {other:?}"),
    }
}
