use crate::detect::{ArtifactFormat, looks_like_json};
use crate::error::{ParseError, decode_utf8};
use crate::model::{ArtifactResults, ParsedArtifact, SourceMeta};
use crate::normalize::NameRules;

pub mod html_report;
pub mod json_report;
pub mod junit_xml;
pub mod perf_csv;

#[cfg(test)]
mod junit_xml_test;
#[cfg(test)]
mod perf_csv_test;

pub use html_report::parse_html_report;
pub use json_report::parse_json_report;
pub use junit_xml::parse_junit_xml;
pub use perf_csv::{PerfCsvOutput, parse_perf_csv};

pub const DEFAULT_MAX_MESSAGE_LEN: usize = 500;

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub max_message_len: usize,
    pub name_rules: NameRules,
    pub test_path_prefixes: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            name_rules: NameRules::default(),
            test_path_prefixes: vec![r"px_green\tests\functional_test\".to_string()],
        }
    }
}

/// Runs the parser selected for `format`. An `.xml` artifact that is not
/// well-formed XML but looks like JSON is retried as a JSON report.
pub fn parse_artifact(
    format: ArtifactFormat,
    source: SourceMeta,
    content: &[u8],
    opts: &ParseOptions,
) -> Result<ParsedArtifact, ParseError> {
    let text = decode_utf8(content)?;
    match format {
        ArtifactFormat::JunitXml => {
            match parse_junit_xml(text, source.clone(), opts.max_message_len) {
                Ok(set) => Ok(ParsedArtifact::tests(set)),
                Err(err) if err.is_malformed() && looks_like_json(text) => {
                    tracing::debug!(
                        artifact = %source.artifact,
                        error = %err,
                        "xml artifact is not well-formed; retrying as json"
                    );
                    parse_json_report(text, source, opts.max_message_len)
                        .map(ParsedArtifact::tests)
                }
                Err(err) => Err(err),
            }
        }
        ArtifactFormat::JsonReport => {
            parse_json_report(text, source, opts.max_message_len).map(ParsedArtifact::tests)
        }
        ArtifactFormat::HtmlReport => Ok(ParsedArtifact::tests(parse_html_report(text, source))),
        ArtifactFormat::PerformanceCsv => {
            let PerfCsvOutput { sets, skipped_rows } =
                parse_perf_csv(text, &source, &opts.name_rules, &opts.test_path_prefixes);
            Ok(ParsedArtifact {
                results: ArtifactResults::Metrics(sets),
                skipped_rows,
            })
        }
        ArtifactFormat::Unrecognized => Err(ParseError::schema_mismatch(
            ArtifactFormat::Unrecognized,
            "no parser handles unrecognized artifacts",
        )),
    }
}
