use std::path::PathBuf;

use thiserror::Error;

use crate::detect::ArtifactFormat;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("failed to start parser pool: {message}")]
    ThreadPool { message: String },
}

/// Artifact-level failure. Never fatal to a batch: the artifact (or, for
/// `NumericField`, the single CSV row) is skipped and the error is recorded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("malformed {format} artifact{}: {message}", describe_position(.line, .byte_offset))]
    Malformed {
        format: ArtifactFormat,
        line: Option<u64>,
        byte_offset: Option<u64>,
        message: String,
    },

    #[error("unexpected {format} document shape: {message}")]
    SchemaMismatch {
        format: ArtifactFormat,
        message: String,
    },

    #[error("line {line}: non-numeric {column} value {value:?}")]
    NumericField {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("artifact is not valid utf-8: {message}")]
    Encoding { message: String },
}

impl ParseError {
    pub fn malformed(format: ArtifactFormat, message: impl Into<String>) -> Self {
        Self::Malformed {
            format,
            line: None,
            byte_offset: None,
            message: message.into(),
        }
    }

    pub fn schema_mismatch(format: ArtifactFormat, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            format,
            message: message.into(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. } | Self::Encoding { .. })
    }
}

fn describe_position(line: &Option<u64>, byte_offset: &Option<u64>) -> String {
    match (*line, *byte_offset) {
        (Some(line), Some(offset)) => format!(" at line {line} (byte {offset})"),
        (Some(line), None) => format!(" at line {line}"),
        (None, Some(offset)) => format!(" at byte {offset}"),
        (None, None) => String::new(),
    }
}

pub(crate) fn decode_utf8(content: &[u8]) -> Result<&str, ParseError> {
    let without_bom = content.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(content);
    std::str::from_utf8(without_bom).map_err(|err| ParseError::Encoding {
        message: err.to_string(),
    })
}

/// 1-based line number of a byte offset into `text`.
pub(crate) fn line_of_offset(text: &str, byte_offset: usize) -> u64 {
    let clamped = byte_offset.min(text.len());
    let newlines = text.as_bytes()[..clamped]
        .iter()
        .filter(|b| **b == b'\n')
        .count();
    newlines as u64 + 1
}
