use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::model::TestIdentity;

pub const TRUNCATION_MARKER: &str = "... [truncated]";

static TITLE_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<ts>\d{1,2}/\d{1,2}/\d{4},?\s*\d{1,2}:\d{2}:\d{2})\s*$").unwrap()
});

static TRAILING_PARAMETERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<base>.*?)\[(?P<params>.*)\]$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrefixRule {
    pub prefix: String,
    #[serde(default)]
    pub replacement: String,
}

impl PrefixRule {
    pub fn strip(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            replacement: String::new(),
        }
    }
}

pub fn default_metric_name_rules() -> Vec<PrefixRule> {
    vec![
        PrefixRule::strip("BLR statistics for "),
        PrefixRule::strip("BLR statictics for "),
    ]
}

/// Ordered prefix rewrites applied once per name. Every rule is tried in
/// order against the progressively rewritten name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRules {
    rules: Vec<PrefixRule>,
}

impl Default for NameRules {
    fn default() -> Self {
        Self::new(default_metric_name_rules())
    }
}

impl NameRules {
    pub fn new(rules: Vec<PrefixRule>) -> Self {
        let rules = rules
            .into_iter()
            .filter(|rule| !rule.prefix.is_empty())
            .collect();
        Self { rules }
    }

    pub fn apply(&self, raw: &str) -> String {
        let trimmed = collapse_whitespace(raw.trim());
        let rewritten = self.rules.iter().fold(trimmed, |name, rule| {
            match name.strip_prefix(rule.prefix.as_str()) {
                Some(rest) => format!("{}{rest}", rule.replacement),
                None => name,
            }
        });
        rewritten.trim().to_string()
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clips `message` to `max_chars` characters, appending a marker when clipped.
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    let trimmed = message.trim();
    match trimmed.char_indices().nth(max_chars) {
        None => trimmed.to_string(),
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &trimmed[..cut]),
    }
}

pub fn non_empty_message(raw: Option<&str>, max_chars: usize) -> Option<String> {
    raw.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| truncate_message(text, max_chars))
}

/// Splits a CSV title cell (`<path> <MM/DD/YYYY, HH:MM:SS>`) into a test
/// identity. Paths may use either separator; `path_prefixes` are removed
/// from the front of the path before the class name is taken.
pub fn parse_title(raw: &str, path_prefixes: &[String]) -> TestIdentity {
    let title = raw.trim().trim_matches('"').trim();
    let (path, timestamp) = match TITLE_TIMESTAMP.captures(title) {
        Some(caps) => {
            let whole = caps.get(0).map_or(title.len(), |m| m.start());
            let ts = caps.name("ts").map(|m| m.as_str().trim().to_string());
            (title[..whole].trim(), ts)
        }
        None => match title.split_once(char::is_whitespace) {
            Some((path, rest)) if !rest.trim().is_empty() => {
                (path.trim(), Some(rest.trim().to_string()))
            }
            _ => (title, None),
        },
    };

    let relative = path_prefixes
        .iter()
        .filter(|prefix| !prefix.is_empty())
        .find_map(|prefix| path.strip_prefix(prefix.as_str()))
        .unwrap_or(path);
    let last_component = relative
        .rsplit(['\\', '/'])
        .find(|part| !part.is_empty())
        .unwrap_or(relative);
    let (class_name, parameters) = match TRAILING_PARAMETERS.captures(last_component) {
        Some(caps) => (
            caps.name("base").map_or("", |m| m.as_str()).to_string(),
            caps.name("params").map(|m| m.as_str().to_string()),
        ),
        None => (last_component.to_string(), None),
    };
    let executed_at = timestamp.as_deref().and_then(parse_title_timestamp);

    TestIdentity {
        test_path: path.to_string(),
        class_name,
        parameters,
        timestamp,
        executed_at,
    }
}

fn parse_title_timestamp(raw: &str) -> Option<chrono::NaiveDateTime> {
    ["%m/%d/%Y, %H:%M:%S", "%m/%d/%Y,%H:%M:%S", "%m/%d/%Y %H:%M:%S"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(raw, fmt).ok())
}
