use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Outcome, SourceMeta, TestCounts, TestResultSet};

static TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<table\b(?P<attrs>[^>]*)>(?P<body>.*?)</table\s*>").unwrap()
});
static ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<tr\b[^>]*>(?P<body>.*?)</tr\s*>").unwrap());
static CELL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<t[hd]\b(?P<attrs>[^>]*)>(?P<body>.*?)</t[hd]\s*>").unwrap()
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static SCRIPT_OR_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>").unwrap()
});
static CONVENTIONAL_TABLE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(id|class)\s*=\s*["'][^"']*\b(results-table|summary|test-summary)\b"#)
        .unwrap()
});
static COL_RESULT_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bclass\s*=\s*["'][^"']*\bcol-result\b"#).unwrap());

static PASSED_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s+passed\b").unwrap());
static FAILED_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s+failed\b").unwrap());
static SKIPPED_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s+skipped\b").unwrap());
static ERROR_TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(\d+)\s+errors?\b").unwrap());
static TOTAL_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+)\s+tests?\s+(ran|run|total|executed|collected)\b").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountColumn {
    Total,
    Passed,
    Failed,
    Skipped,
    Error,
}

#[derive(Debug, Default, Clone, Copy)]
struct CountAccumulator {
    total: Option<u64>,
    passed: u64,
    failed: u64,
    skipped: u64,
    error: u64,
    matched: bool,
}

impl CountAccumulator {
    fn set(&mut self, column: CountColumn, value: u64) {
        self.matched = true;
        match column {
            CountColumn::Total => self.total = Some(value),
            CountColumn::Passed => self.passed = value,
            CountColumn::Failed => self.failed = value,
            CountColumn::Skipped => self.skipped = value,
            CountColumn::Error => self.error = value,
        }
    }

    fn finish(self) -> Option<TestCounts> {
        self.matched.then(|| {
            TestCounts::from_reported(
                self.total,
                self.passed,
                self.failed,
                self.skipped,
                self.error,
            )
        })
    }
}

#[derive(Debug, Clone)]
struct HtmlCell {
    attrs: String,
    text: String,
}

#[derive(Debug)]
struct HtmlTable {
    conventional: bool,
    rows: Vec<Vec<HtmlCell>>,
}

/// HTML reports never fail to parse: a page with no recognizable counts is a
/// report of zero tests.
pub fn parse_html_report(text: &str, source: SourceMeta) -> TestResultSet {
    let counts = counts_from_tables(text).or_else(|| {
        tracing::debug!(artifact = %source.artifact, "no results table; scanning text");
        counts_from_text(text)
    });
    match counts {
        Some(counts) => TestResultSet::from_counts(source, counts),
        None => {
            tracing::info!(
                artifact = %source.artifact,
                board = %source.board,
                suite = %source.suite,
                "no test counts found in html report; treating as zero tests"
            );
            TestResultSet::from_counts(source, TestCounts::default())
        }
    }
}

fn counts_from_tables(text: &str) -> Option<TestCounts> {
    let tables = TABLE
        .captures_iter(text)
        .map(|caps| HtmlTable {
            conventional: caps
                .name("attrs")
                .is_some_and(|m| CONVENTIONAL_TABLE_ATTR.is_match(m.as_str())),
            rows: caps
                .name("body")
                .map_or_else(Vec::new, |m| table_rows(m.as_str())),
        })
        .collect::<Vec<_>>();

    let conventional_first = tables
        .iter()
        .filter(|table| table.conventional)
        .chain(tables.iter().filter(|table| !table.conventional));
    for table in conventional_first {
        if let Some(counts) = counts_from_header_layout(&table.rows) {
            return Some(counts);
        }
        if !table.conventional {
            continue;
        }
        if let Some(counts) = counts_from_key_value_layout(&table.rows) {
            return Some(counts);
        }
        if let Some(counts) = counts_from_result_cells(&table.rows) {
            return Some(counts);
        }
    }
    None
}

fn table_rows(body: &str) -> Vec<Vec<HtmlCell>> {
    ROW.captures_iter(body)
        .filter_map(|row| row.name("body"))
        .map(|row| {
            CELL.captures_iter(row.as_str())
                .map(|cell| HtmlCell {
                    attrs: cell.name("attrs").map_or("", |m| m.as_str()).to_string(),
                    text: cell_text(cell.name("body").map_or("", |m| m.as_str())),
                })
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect()
}

/// A header row naming at least Tests, Passed and Failed, followed by a row
/// of numbers in the same columns.
fn counts_from_header_layout(rows: &[Vec<HtmlCell>]) -> Option<TestCounts> {
    let header_index = rows.iter().position(|row| {
        let columns = row
            .iter()
            .filter_map(|cell| count_column(&cell.text))
            .collect::<Vec<_>>();
        [CountColumn::Total, CountColumn::Passed, CountColumn::Failed]
            .iter()
            .all(|needed| columns.contains(needed))
    })?;
    let header = &rows[header_index];
    let values = rows[header_index + 1..]
        .iter()
        .find(|row| row.iter().any(|cell| parse_count(&cell.text).is_some()))?;

    let mut acc = CountAccumulator::default();
    header.iter().zip(values.iter()).for_each(|(head, value)| {
        if let (Some(column), Some(count)) = (count_column(&head.text), parse_count(&value.text)) {
            acc.set(column, count);
        }
    });
    acc.finish()
}

/// pytest-html style summary: one `label | count` pair per row.
fn counts_from_key_value_layout(rows: &[Vec<HtmlCell>]) -> Option<TestCounts> {
    let mut acc = CountAccumulator::default();
    rows.iter()
        .filter(|row| row.len() >= 2)
        .filter_map(|row| Some((count_column(&row[0].text)?, parse_count(&row[1].text)?)))
        .for_each(|(column, count)| acc.set(column, count));
    acc.finish()
}

/// Per-test rows only: count the outcome written in each `col-result` cell.
fn counts_from_result_cells(rows: &[Vec<HtmlCell>]) -> Option<TestCounts> {
    let outcomes = rows
        .iter()
        .filter_map(|row| {
            row.iter()
                .find(|cell| COL_RESULT_ATTR.is_match(&cell.attrs))
                .map(|cell| Outcome::from_label(&cell.text))
        })
        .collect::<Vec<_>>();
    if outcomes.is_empty() {
        return None;
    }
    let mut counts = TestCounts::default();
    outcomes.iter().for_each(|outcome| {
        counts.total += 1;
        match outcome {
            Outcome::Passed => counts.passed += 1,
            Outcome::Failed => counts.failed += 1,
            Outcome::Skipped => counts.skipped += 1,
            Outcome::Error => counts.error += 1,
        }
    });
    Some(counts)
}

/// Regex fallback over the visible text: `<N> passed`, `<N> failed`,
/// `<N> skipped`, `<N> error(s)`, in any order, first occurrence of each.
fn counts_from_text(text: &str) -> Option<TestCounts> {
    let visible = visible_text(text);
    let mut acc = CountAccumulator::default();
    [
        (&*PASSED_TEXT, CountColumn::Passed),
        (&*FAILED_TEXT, CountColumn::Failed),
        (&*SKIPPED_TEXT, CountColumn::Skipped),
        (&*ERROR_TEXT, CountColumn::Error),
        (&*TOTAL_TEXT, CountColumn::Total),
    ]
    .into_iter()
    .filter_map(|(pattern, column)| Some((column, first_count(pattern, &visible)?)))
    .for_each(|(column, count)| acc.set(column, count));
    acc.finish()
}

fn first_count(pattern: &Regex, text: &str) -> Option<u64> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
}

fn count_column(label: &str) -> Option<CountColumn> {
    let label = label.trim().trim_end_matches(':').trim().to_ascii_lowercase();
    Some(match label.as_str() {
        "tests" | "test" | "total" | "total tests" => CountColumn::Total,
        "passed" | "pass" | "passes" => CountColumn::Passed,
        "failed" | "fail" | "failures" => CountColumn::Failed,
        "skipped" | "skip" | "skips" => CountColumn::Skipped,
        "error" | "errors" => CountColumn::Error,
        _ => return None,
    })
}

fn parse_count(text: &str) -> Option<u64> {
    text.trim().replace(',', "").parse::<u64>().ok()
}

fn cell_text(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn visible_text(html: &str) -> String {
    let without_code = SCRIPT_OR_STYLE.replace_all(html, " ");
    let stripped = TAG.replace_all(&without_code, " ");
    decode_entities(&stripped)
}

fn decode_entities(text: &str) -> String {
    [
        ("&nbsp;", " "),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&amp;", "&"),
    ]
    .iter()
    .fold(text.to_string(), |acc, (entity, plain)| acc.replace(entity, plain))
}
