use std::fmt;
use std::path::Path;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use serde::Serialize;

use crate::error::ReportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ArtifactFormat {
    JunitXml,
    JsonReport,
    HtmlReport,
    PerformanceCsv,
    Unrecognized,
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::JunitXml => "junit-xml",
            Self::JsonReport => "json-report",
            Self::HtmlReport => "html-report",
            Self::PerformanceCsv => "performance-csv",
            Self::Unrecognized => "unrecognized",
        })
    }
}

pub fn default_filename_patterns() -> Vec<String> {
    [
        "test",
        "result",
        "report",
        "junit",
        "pytest",
        "coverage",
        "pytr",
        "pytest-report",
        "test-report",
        "test_report",
        "performance_data",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

/// Filename-then-extension classifier. Pure: never reads anything but the
/// bytes it is handed.
#[derive(Debug, Clone)]
pub struct FormatDetector {
    name_patterns: AhoCorasick,
}

impl FormatDetector {
    pub fn new(patterns: &[String]) -> Result<Self, ReportError> {
        let patterns = patterns
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>();
        let name_patterns = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .build(&patterns)
            .map_err(|err| ReportError::InvalidPattern {
                pattern: patterns.join(","),
                message: err.to_string(),
            })?;
        Ok(Self { name_patterns })
    }

    pub fn with_default_patterns() -> Result<Self, ReportError> {
        Self::new(&default_filename_patterns())
    }

    pub fn is_candidate_name(&self, filename: &str) -> bool {
        let base = base_name(filename);
        self.name_patterns.find(base).is_some()
    }

    pub fn detect(&self, filename: &str, content: &[u8]) -> ArtifactFormat {
        if !self.is_candidate_name(filename) {
            tracing::debug!(artifact = filename, "no result-file pattern in name");
            return ArtifactFormat::Unrecognized;
        }
        let format = format_from_extension(filename).unwrap_or_else(|| sniff_content(content));
        tracing::debug!(artifact = filename, %format, "classified artifact");
        format
    }
}

fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(filename)
}

pub fn format_from_extension(filename: &str) -> Option<ArtifactFormat> {
    let ext = Path::new(base_name(filename))
        .extension()
        .and_then(|x| x.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "xml" => Some(ArtifactFormat::JunitXml),
        "json" => Some(ArtifactFormat::JsonReport),
        "html" | "htm" => Some(ArtifactFormat::HtmlReport),
        "csv" => Some(ArtifactFormat::PerformanceCsv),
        _ => None,
    }
}

/// Classification by leading bytes for names whose extension says nothing.
pub fn sniff_content(content: &[u8]) -> ArtifactFormat {
    let head = &content[..content.len().min(512)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start_matches('\u{feff}').trim_start();
    let lower = head.to_ascii_lowercase();
    if lower.starts_with("<?xml") && !lower.contains("<html") {
        return ArtifactFormat::JunitXml;
    }
    if lower.starts_with("<testsuite") {
        return ArtifactFormat::JunitXml;
    }
    if lower.starts_with("<!doctype html") || lower.starts_with("<html") {
        return ArtifactFormat::HtmlReport;
    }
    if lower.starts_with('{') {
        return ArtifactFormat::JsonReport;
    }
    ArtifactFormat::Unrecognized
}

pub(crate) fn looks_like_json(text: &str) -> bool {
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    trimmed.starts_with('{') || trimmed.starts_with('[')
}
