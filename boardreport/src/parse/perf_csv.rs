use csv::{ReaderBuilder, StringRecord};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::detect::ArtifactFormat;
use crate::error::ParseError;
use crate::evaluate::{evaluate_metric, reported_verdict};
use crate::model::{MetricSet, PerformanceMetric, SourceMeta, TestIdentity};
use crate::normalize::{NameRules, parse_title};

static TIME_OF_DAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d{1,2}:\d{2}:\d{2}\s*$").unwrap());

/// Column positions of a metric row. Defaults follow the literal layout
/// `Class Name, Parameters, Before, After, Threshold, Status`; a header row
/// may move them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CsvColumns {
    parameter: usize,
    before: usize,
    after: usize,
    threshold: usize,
    status: Option<usize>,
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            parameter: 1,
            before: 2,
            after: 3,
            threshold: 4,
            status: Some(5),
        }
    }
}

impl CsvColumns {
    fn from_header(record: &StringRecord) -> Self {
        let find = |needle: &str| {
            record
                .iter()
                .position(|field| field.trim().to_ascii_lowercase().contains(needle))
        };
        let defaults = Self::default();
        Self {
            parameter: find("parameter").unwrap_or(defaults.parameter),
            before: find("before").unwrap_or(defaults.before),
            after: find("after").unwrap_or(defaults.after),
            threshold: find("threshold").unwrap_or(defaults.threshold),
            status: find("status"),
        }
    }

    fn min_len(&self) -> usize {
        [self.parameter, self.before, self.after, self.threshold]
            .into_iter()
            .max()
            .unwrap_or(0)
            + 1
    }
}

#[derive(Debug)]
enum CsvRow {
    Blank,
    Header(CsvColumns),
    Title(String),
    Metric,
    /// A class name next to metric values; neither a title nor a metric row.
    Mixed,
}

#[derive(Debug)]
pub struct PerfCsvOutput {
    pub sets: Vec<MetricSet>,
    pub skipped_rows: Vec<ParseError>,
}

#[derive(Debug)]
struct PerfCsvState<'a> {
    source: &'a SourceMeta,
    name_rules: &'a NameRules,
    path_prefixes: &'a [String],
    columns: CsvColumns,
    current: Option<MetricSet>,
    sets: Vec<MetricSet>,
    skipped_rows: Vec<ParseError>,
}

/// One `MetricSet` per title block. Bad rows are skipped and reported; they
/// never abort the file.
pub fn parse_perf_csv(
    text: &str,
    source: &SourceMeta,
    name_rules: &NameRules,
    path_prefixes: &[String],
) -> PerfCsvOutput {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut state = PerfCsvState {
        source,
        name_rules,
        path_prefixes,
        columns: CsvColumns::default(),
        current: None,
        sets: vec![],
        skipped_rows: vec![],
    };

    for (index, record) in reader.records().enumerate() {
        let fallback_line = index as u64 + 1;
        match record {
            Ok(record) => {
                let line = record.position().map_or(fallback_line, |p| p.line());
                state.push_record(&record, line);
            }
            Err(err) => {
                let line = err.position().map_or(fallback_line, |p| p.line());
                state.skip(ParseError::Malformed {
                    format: ArtifactFormat::PerformanceCsv,
                    line: Some(line),
                    byte_offset: err.position().map(|p| p.byte()),
                    message: err.to_string(),
                });
            }
        }
    }

    state.flush();
    PerfCsvOutput {
        sets: state.sets,
        skipped_rows: state.skipped_rows,
    }
}

impl PerfCsvState<'_> {
    fn push_record(&mut self, record: &StringRecord, line: u64) {
        match classify_row(record) {
            CsvRow::Blank => {}
            CsvRow::Header(columns) => self.columns = columns,
            CsvRow::Title(title) => {
                self.flush();
                self.start_block(parse_title(&title, self.path_prefixes));
            }
            CsvRow::Metric => self.push_metric_row(record, line),
            CsvRow::Mixed => self.skip(ParseError::Malformed {
                format: ArtifactFormat::PerformanceCsv,
                line: Some(line),
                byte_offset: None,
                message: "row carries both a class name and metric values".to_string(),
            }),
        }
    }

    fn start_block(&mut self, test: TestIdentity) {
        let mut source = self.source.clone();
        source.timestamp = test.timestamp.clone();
        self.current = Some(MetricSet {
            source,
            test,
            metrics: vec![],
        });
    }

    fn push_metric_row(&mut self, record: &StringRecord, line: u64) {
        if self.current.is_none() {
            self.skip(ParseError::Malformed {
                format: ArtifactFormat::PerformanceCsv,
                line: Some(line),
                byte_offset: None,
                message: "metric row appears before any test title row".to_string(),
            });
            return;
        }
        match metric_from_row(record, line, self.columns, self.name_rules) {
            Ok(metric) => {
                if let Some(current) = self.current.as_mut() {
                    current.metrics.push(metric);
                }
            }
            Err(err) => self.skip(err),
        }
    }

    fn skip(&mut self, err: ParseError) {
        tracing::warn!(
            artifact = %self.source.artifact,
            board = %self.source.board,
            suite = %self.source.suite,
            error = %err,
            "skipping performance csv row"
        );
        self.skipped_rows.push(err);
    }

    fn flush(&mut self) {
        if let Some(set) = self.current.take() {
            self.sets.push(set);
        }
    }
}

fn classify_row(record: &StringRecord) -> CsvRow {
    let fields = record.iter().collect::<Vec<_>>();
    let Some(first) = fields.first() else {
        return CsvRow::Blank;
    };
    if fields.iter().all(|field| field.trim().is_empty()) {
        return CsvRow::Blank;
    }
    if first.trim().eq_ignore_ascii_case("class name") {
        return CsvRow::Header(CsvColumns::from_header(record));
    }
    if first.trim().is_empty() {
        return CsvRow::Metric;
    }

    // A title may arrive unquoted, in which case the comma inside its
    // timestamp splits it across the first two fields.
    let title_len = match fields.get(1) {
        Some(second) if TIME_OF_DAY.is_match(second) => 2,
        _ => 1,
    };
    if fields[title_len..].iter().all(|field| field.trim().is_empty()) {
        CsvRow::Title(fields[..title_len].join(","))
    } else {
        CsvRow::Mixed
    }
}

fn metric_from_row(
    record: &StringRecord,
    line: u64,
    columns: CsvColumns,
    name_rules: &NameRules,
) -> Result<PerformanceMetric, ParseError> {
    if record.len() < columns.min_len() {
        return Err(ParseError::Malformed {
            format: ArtifactFormat::PerformanceCsv,
            line: Some(line),
            byte_offset: None,
            message: format!(
                "metric row has {} fields, expected at least {}",
                record.len(),
                columns.min_len()
            ),
        });
    }
    let field = |index: usize| record.get(index).unwrap_or("").trim();

    let name = name_rules.apply(field(columns.parameter));
    if name.is_empty() {
        return Err(ParseError::Malformed {
            format: ArtifactFormat::PerformanceCsv,
            line: Some(line),
            byte_offset: None,
            message: "metric row has no parameter name".to_string(),
        });
    }
    let before = parse_number(field(columns.before), line, "before")?;
    let after = parse_number(field(columns.after), line, "after")?;
    let threshold = parse_number(field(columns.threshold), line, "threshold")?;

    let mut metric = evaluate_metric(name, before, after, threshold);
    metric.reported_status = columns
        .status
        .map(field)
        .filter(|status| !status.is_empty())
        .map(str::to_string);
    if let Some(reported) = metric.reported_status.as_deref().and_then(reported_verdict) {
        if reported != metric.verdict {
            tracing::debug!(
                metric = %metric.name,
                line,
                ?reported,
                computed = ?metric.verdict,
                "reported status disagrees with threshold verdict"
            );
        }
    }
    Ok(metric)
}

fn parse_number(raw: &str, line: u64, column: &'static str) -> Result<f64, ParseError> {
    let cleaned = raw.trim().trim_end_matches('%').trim();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ParseError::NumericField {
            line,
            column,
            value: raw.to_string(),
        })
}
