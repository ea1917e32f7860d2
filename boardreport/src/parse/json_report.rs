use serde::Deserialize;
use serde_json::{Map, Value};

use crate::detect::ArtifactFormat;
use crate::error::ParseError;
use crate::model::{Outcome, SourceMeta, TestCase, TestCounts, TestResultSet};
use crate::normalize::non_empty_message;

const COUNTER_KEYS: [&str; 6] = ["total", "passed", "failed", "skipped", "error", "errors"];

/// The document shapes this parser understands, decided once up front.
#[derive(Debug)]
enum JsonReportShape<'a> {
    CaseList(&'a [Value]),
    Counters(&'a Map<String, Value>),
}

#[derive(Debug, Deserialize)]
struct JsonCaseEntry {
    nodeid: Option<String>,
    name: Option<String>,
    outcome: Option<String>,
    status: Option<String>,
    duration: Option<f64>,
    message: Option<Value>,
    longrepr: Option<Value>,
    call: Option<JsonCallPhase>,
}

#[derive(Debug, Deserialize)]
struct JsonCallPhase {
    longrepr: Option<Value>,
    crash: Option<JsonCrash>,
}

#[derive(Debug, Deserialize)]
struct JsonCrash {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonCounters {
    total: Option<u64>,
    passed: Option<u64>,
    failed: Option<u64>,
    skipped: Option<u64>,
    #[serde(alias = "errors")]
    error: Option<u64>,
}

pub fn parse_json_report(
    text: &str,
    source: SourceMeta,
    max_message_len: usize,
) -> Result<TestResultSet, ParseError> {
    let root: Value = serde_json::from_str(text).map_err(|err| ParseError::Malformed {
        format: ArtifactFormat::JsonReport,
        line: Some(err.line() as u64),
        byte_offset: None,
        message: err.to_string(),
    })?;

    let duration = report_duration(&root);
    match detect_shape(&root) {
        Some(JsonReportShape::CaseList(entries)) => {
            let cases = entries
                .iter()
                .enumerate()
                .map(|(index, entry)| case_from_entry(index, entry, max_message_len))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TestResultSet::from_cases(source, cases).with_reported_duration(duration))
        }
        Some(JsonReportShape::Counters(object)) => {
            let counters = serde_json::from_value::<JsonCounters>(Value::Object(object.clone()))
                .map_err(|err| schema_mismatch(format!("invalid counters: {err}")))?;
            let counts = TestCounts::from_reported(
                counters.total,
                counters.passed.unwrap_or(0),
                counters.failed.unwrap_or(0),
                counters.skipped.unwrap_or(0),
                counters.error.unwrap_or(0),
            );
            Ok(TestResultSet::from_counts(source, counts).with_reported_duration(duration))
        }
        None => Err(schema_mismatch(
            "expected a `tests` array or aggregate counters (total/passed/failed/skipped)",
        )),
    }
}

fn detect_shape(root: &Value) -> Option<JsonReportShape<'_>> {
    let object = root.as_object()?;
    if let Some(entries) = object.get("tests").and_then(Value::as_array) {
        return Some(JsonReportShape::CaseList(entries));
    }
    if has_counters(object) {
        return Some(JsonReportShape::Counters(object));
    }
    object
        .get("summary")
        .and_then(Value::as_object)
        .filter(|summary| has_counters(summary))
        .map(JsonReportShape::Counters)
}

/// Run duration from the top level, or from `summary` when only that has one.
fn report_duration(root: &Value) -> Option<f64> {
    root.get("duration").and_then(Value::as_f64).or_else(|| {
        root.get("summary")
            .and_then(|summary| summary.get("duration"))
            .and_then(Value::as_f64)
    })
}

fn has_counters(object: &Map<String, Value>) -> bool {
    COUNTER_KEYS
        .iter()
        .any(|key| object.get(*key).is_some_and(Value::is_u64))
}

fn case_from_entry(
    index: usize,
    entry: &Value,
    max_message_len: usize,
) -> Result<TestCase, ParseError> {
    let parsed = serde_json::from_value::<JsonCaseEntry>(entry.clone())
        .map_err(|err| schema_mismatch(format!("tests[{index}]: {err}")))?;
    let name = parsed
        .nodeid
        .or(parsed.name)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| schema_mismatch(format!("tests[{index}] has no nodeid or name")))?;
    let outcome = parsed
        .outcome
        .or(parsed.status)
        .map(|raw| Outcome::from_label(&raw))
        .unwrap_or(Outcome::Error);
    let message = match outcome {
        Outcome::Failed | Outcome::Error => {
            let raw = parsed
                .call
                .as_ref()
                .and_then(|call| call.longrepr.as_ref().map(value_text))
                .or_else(|| {
                    parsed
                        .call
                        .as_ref()
                        .and_then(|call| call.crash.as_ref())
                        .and_then(|crash| crash.message.clone())
                })
                .or_else(|| parsed.longrepr.as_ref().map(value_text))
                .or_else(|| parsed.message.as_ref().map(value_text));
            non_empty_message(raw.as_deref(), max_message_len)
        }
        Outcome::Passed | Outcome::Skipped => None,
    };
    Ok(TestCase {
        name: name.trim().to_string(),
        outcome,
        message,
        duration_secs: parsed.duration,
    })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn schema_mismatch(message: impl Into<String>) -> ParseError {
    ParseError::schema_mismatch(ArtifactFormat::JsonReport, message)
}
