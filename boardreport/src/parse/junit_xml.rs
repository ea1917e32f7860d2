use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::detect::ArtifactFormat;
use crate::error::{ParseError, line_of_offset};
use crate::model::{Outcome, SourceMeta, TestCase, TestResultSet};
use crate::normalize::non_empty_message;

#[derive(Debug, Default)]
struct CaseBuf {
    name: String,
    classname: Option<String>,
    suite: Option<String>,
    duration_secs: Option<f64>,
    outcome: Option<Outcome>,
    message_attr: Option<String>,
    text: String,
}

#[derive(Debug, Default)]
struct JunitParseState {
    depth: usize,
    saw_root: bool,
    suite_names: Vec<Option<String>>,
    current: Option<CaseBuf>,
    capturing_outcome_text: bool,
    cases: Vec<TestCase>,
    root_duration: Option<f64>,
    suite_duration: Option<f64>,
}

/// Counters come from the parsed `<testcase>` elements only; root-level
/// `tests`/`failures` attributes are ignored.
pub fn parse_junit_xml(
    text: &str,
    source: SourceMeta,
    max_message_len: usize,
) -> Result<TestResultSet, ParseError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut state = JunitParseState::default();

    loop {
        let event = reader
            .read_event()
            .map_err(|err| malformed_at(text, reader.error_position() as usize, err))?;
        match event {
            Event::Start(start) => {
                state.open(&start, text, reader.buffer_position() as usize)?;
                state.depth += 1;
            }
            Event::Empty(start) => {
                state.open(&start, text, reader.buffer_position() as usize)?;
                state.close(start.local_name().as_ref(), max_message_len);
            }
            Event::End(end) => {
                state.depth = state.depth.saturating_sub(1);
                state.close(end.local_name().as_ref(), max_message_len);
            }
            Event::Text(body) if state.capturing_outcome_text => {
                let unescaped = body
                    .unescape()
                    .map_err(|err| malformed_at(text, reader.buffer_position() as usize, err))?;
                state.push_text(&unescaped);
            }
            Event::CData(body) if state.capturing_outcome_text => {
                state.push_text(&String::from_utf8_lossy(&body));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if state.depth > 0 {
        return Err(ParseError::Malformed {
            format: ArtifactFormat::JunitXml,
            line: Some(line_of_offset(text, text.len())),
            byte_offset: Some(text.len() as u64),
            message: format!("document ends with {} unclosed element(s)", state.depth),
        });
    }
    if !state.saw_root {
        return Err(ParseError::malformed(
            ArtifactFormat::JunitXml,
            "document has no root element",
        ));
    }
    let reported = state.root_duration.or(state.suite_duration);
    Ok(TestResultSet::from_cases(source, state.cases).with_reported_duration(reported))
}

impl JunitParseState {
    fn open(
        &mut self,
        start: &BytesStart<'_>,
        text: &str,
        offset: usize,
    ) -> Result<(), ParseError> {
        let name = start.local_name();
        let name = name.as_ref();
        if !self.saw_root {
            self.saw_root = true;
            if name != b"testsuites" && name != b"testsuite" {
                return Err(ParseError::schema_mismatch(
                    ArtifactFormat::JunitXml,
                    format!(
                        "root element <{}> is not <testsuites> or <testsuite>",
                        String::from_utf8_lossy(name)
                    ),
                ));
            }
        }
        match name {
            b"testsuites" => {
                self.root_duration = seconds(attr(start, b"time", text, offset)?);
            }
            b"testsuite" => {
                // Nested suites are already included in their parent's time.
                if self.suite_names.is_empty() {
                    if let Some(secs) = seconds(attr(start, b"time", text, offset)?) {
                        *self.suite_duration.get_or_insert(0.0) += secs;
                    }
                }
                let suite_name = attr(start, b"name", text, offset)?;
                self.suite_names.push(suite_name);
            }
            b"testcase" => {
                let suite = self.suite_names.iter().rev().find_map(Clone::clone);
                self.current = Some(CaseBuf {
                    name: attr(start, b"name", text, offset)?
                        .unwrap_or_else(|| "Unknown".to_string()),
                    classname: attr(start, b"classname", text, offset)?,
                    suite,
                    duration_secs: seconds(attr(start, b"time", text, offset)?),
                    ..CaseBuf::default()
                });
            }
            b"failure" | b"error" | b"skipped" => {
                let Some(case) = self.current.as_mut() else {
                    return Ok(());
                };
                let outcome = match name {
                    b"failure" => Outcome::Failed,
                    b"error" => Outcome::Error,
                    _ => Outcome::Skipped,
                };
                if case.outcome.is_none() || case.outcome == Some(Outcome::Skipped) {
                    case.outcome = Some(outcome);
                    case.message_attr = attr(start, b"message", text, offset)?;
                    case.text.clear();
                    self.capturing_outcome_text = outcome != Outcome::Skipped;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8], max_message_len: usize) {
        match name {
            b"testsuite" => {
                self.suite_names.pop();
            }
            b"testcase" => {
                if let Some(case) = self.current.take() {
                    self.cases.push(finish_case(case, max_message_len));
                }
                self.capturing_outcome_text = false;
            }
            b"failure" | b"error" | b"skipped" => {
                self.capturing_outcome_text = false;
            }
            _ => {}
        }
    }

    fn push_text(&mut self, chunk: &str) {
        if let Some(case) = self.current.as_mut() {
            if !case.text.is_empty() {
                case.text.push('\n');
            }
            case.text.push_str(chunk);
        }
    }
}

fn finish_case(case: CaseBuf, max_message_len: usize) -> TestCase {
    let outcome = case.outcome.unwrap_or(Outcome::Passed);
    let message = match outcome {
        Outcome::Failed | Outcome::Error => {
            non_empty_message(Some(case.text.as_str()), max_message_len)
                .or_else(|| non_empty_message(case.message_attr.as_deref(), max_message_len))
        }
        Outcome::Passed | Outcome::Skipped => None,
    };
    let qualifier = case
        .classname
        .filter(|c| !c.trim().is_empty())
        .or(case.suite.filter(|s| !s.trim().is_empty()));
    let name = match qualifier {
        Some(qualifier) => format!("{}::{}", qualifier.trim(), case.name.trim()),
        None => case.name.trim().to_string(),
    };
    TestCase {
        name,
        outcome,
        message,
        duration_secs: case.duration_secs,
    }
}

fn attr(
    start: &BytesStart<'_>,
    key: &[u8],
    text: &str,
    offset: usize,
) -> Result<Option<String>, ParseError> {
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| malformed_at(text, offset, err))?;
        if attribute.key.local_name().as_ref() == key {
            let value = attribute
                .unescape_value()
                .map_err(|err| malformed_at(text, offset, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn seconds(raw: Option<String>) -> Option<f64> {
    raw.and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite())
}

fn malformed_at(text: &str, offset: usize, err: impl std::fmt::Display) -> ParseError {
    ParseError::Malformed {
        format: ArtifactFormat::JunitXml,
        line: Some(line_of_offset(text, offset)),
        byte_offset: Some(offset as u64),
        message: err.to_string(),
    }
}
