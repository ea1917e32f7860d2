use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::detect::{FormatDetector, default_filename_patterns};
use crate::error::ReportError;
use crate::labels::LabelRules;
use crate::normalize::{NameRules, PrefixRule, default_metric_name_rules};
use crate::parse::{DEFAULT_MAX_MESSAGE_LEN, ParseOptions};
use crate::status::DEFAULT_CRITICAL_ISSUE_SAMPLE_LIMIT;

/// File-level settings. Every key is optional; accessors fill in defaults.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfig {
    pub max_failure_message_length: Option<usize>,
    pub critical_issue_sample_limit: Option<usize>,
    pub filename_patterns: Option<Vec<String>>,
    pub metric_name_rules: Option<Vec<PrefixRule>>,
    pub test_path_prefixes: Option<Vec<String>>,
    pub drop_skipped_only_suites: Option<bool>,

    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub board_dir_prefixes: Option<Vec<String>>,
    pub suite_dir_prefix: Option<String>,
}

impl ReportConfig {
    pub fn max_failure_message_length(&self) -> usize {
        self.max_failure_message_length
            .unwrap_or(DEFAULT_MAX_MESSAGE_LEN)
    }

    pub fn critical_issue_sample_limit(&self) -> usize {
        self.critical_issue_sample_limit
            .unwrap_or(DEFAULT_CRITICAL_ISSUE_SAMPLE_LIMIT)
    }

    pub fn drop_skipped_only_suites(&self) -> bool {
        self.drop_skipped_only_suites.unwrap_or(false)
    }

    pub fn filename_patterns(&self) -> Vec<String> {
        self.filename_patterns
            .clone()
            .unwrap_or_else(default_filename_patterns)
    }

    pub fn detector(&self) -> Result<FormatDetector, ReportError> {
        FormatDetector::new(&self.filename_patterns())
    }

    pub fn parse_options(&self) -> ParseOptions {
        let defaults = ParseOptions::default();
        ParseOptions {
            max_message_len: self.max_failure_message_length(),
            name_rules: NameRules::new(
                self.metric_name_rules
                    .clone()
                    .unwrap_or_else(default_metric_name_rules),
            ),
            test_path_prefixes: self
                .test_path_prefixes
                .clone()
                .unwrap_or(defaults.test_path_prefixes),
        }
    }

    pub fn label_rules(&self) -> LabelRules {
        let defaults = LabelRules::default();
        LabelRules {
            board_dir_prefixes: self
                .board_dir_prefixes
                .clone()
                .unwrap_or(defaults.board_dir_prefixes),
            suite_dir_prefix: self
                .suite_dir_prefix
                .clone()
                .unwrap_or(defaults.suite_dir_prefix),
        }
    }
}

pub fn discover_config_path(root: &Path) -> Option<PathBuf> {
    let names = [
        "boardreport.toml",
        "boardreport.config.json",
        "boardreport.config.json5",
        "boardreport.config.yaml",
        "boardreport.config.yml",
        ".boardreportrc.json",
    ];
    names
        .into_iter()
        .map(|name| root.join(name))
        .find(|p| p.exists())
}

/// Dedicated config file first, then a `[tool.boardreport]` table in
/// `pyproject.toml`, then defaults.
pub fn load_report_config(root: &Path) -> Result<ReportConfig, ReportError> {
    if let Some(path) = discover_config_path(root) {
        tracing::debug!(path = %path.display(), "loading config");
        return load_report_config_from_path(&path);
    }

    let pyproject_path = root.join("pyproject.toml");
    if pyproject_path.exists() {
        if let Some(config) = load_toml_config(&pyproject_path, TomlConfigSource::PyProjectTool)? {
            return Ok(config);
        }
    }
    Ok(ReportConfig::default())
}

pub fn load_report_config_from_path(path: &Path) -> Result<ReportConfig, ReportError> {
    let ext = path
        .extension()
        .and_then(|x| x.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" | "json5" => load_json_config(path),
        "yaml" | "yml" => load_yaml_config(path),
        "toml" => load_toml_config(path, TomlConfigSource::FullFile).map(|v| v.unwrap_or_default()),
        _ => Err(ReportError::ConfigParse {
            path: path.to_path_buf(),
            message: format!("unsupported config extension {ext:?}"),
        }),
    }
}

fn read_config(path: &Path) -> Result<String, ReportError> {
    std::fs::read_to_string(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_json_config(path: &Path) -> Result<ReportConfig, ReportError> {
    let raw = read_config(path)?;
    json5::from_str::<ReportConfig>(&raw)
        .or_else(|_| serde_json::from_str::<ReportConfig>(&raw))
        .map_err(|err| ReportError::ConfigParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}

fn load_yaml_config(path: &Path) -> Result<ReportConfig, ReportError> {
    let raw = read_config(path)?;
    serde_yaml::from_str::<ReportConfig>(&raw).map_err(|err| ReportError::ConfigParse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TomlConfigSource {
    FullFile,
    PyProjectTool,
}

fn load_toml_config(
    path: &Path,
    source: TomlConfigSource,
) -> Result<Option<ReportConfig>, ReportError> {
    let raw = read_config(path)?;
    let toml_value = toml::from_str::<toml::Value>(&raw).map_err(|err| ReportError::ConfigParse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;

    let table_value = match source {
        TomlConfigSource::FullFile => Some(toml_value),
        TomlConfigSource::PyProjectTool => toml_value
            .as_table()
            .and_then(|root| root.get("tool"))
            .and_then(|tool| tool.as_table())
            .and_then(|tool_table| tool_table.get("boardreport"))
            .cloned(),
    };
    let Some(table_value) = table_value else {
        return Ok(None);
    };

    let json_value = serde_json::to_value(table_value).map_err(|err| ReportError::ConfigParse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    serde_json::from_value::<ReportConfig>(normalize_keys_to_camel_case(&json_value))
        .map(Some)
        .map_err(|err| ReportError::ConfigParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}

fn normalize_keys_to_camel_case(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(object) => JsonValue::Object(
            object
                .iter()
                .map(|(key, value)| (camel_case_key(key), normalize_keys_to_camel_case(value)))
                .collect(),
        ),
        JsonValue::Array(array) => {
            JsonValue::Array(array.iter().map(normalize_keys_to_camel_case).collect())
        }
        other => other.clone(),
    }
}

fn camel_case_key(key: &str) -> String {
    let mut segments = key.split('_').filter(|segment| !segment.is_empty());
    let Some(first_segment) = segments.next() else {
        return key.to_string();
    };
    segments.fold(first_segment.to_string(), |mut acc, segment| {
        let mut chars = segment.chars();
        if let Some(first_char) = chars.next() {
            acc.push(first_char.to_ascii_uppercase());
            acc.extend(chars);
        }
        acc
    })
}
