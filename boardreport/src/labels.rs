//! Board and suite labels derived from CI artifact names and directory
//! layouts such as `nightly/BFT_h743zi_dev/suite_BLR_Test_IoT_SNTP/...`.

pub const UNKNOWN_BOARD: &str = "Unknown Board";
pub const UNKNOWN_SUITE: &str = "Unknown Suite";

const ARTIFACT_PREFIX: &str = "artifacts_";
const PYTEST_MARKER: &str = "BFT PyTest ";
const REPORT_MARKER: &str = "PyTest test_report=";
const ATTEMPT_MARKER: &str = "; JobAttempt=";

/// `PyTest test_report=BFT PyTest Cert_Test; JobAttempt=1` -> `Cert_Test`.
/// Names in no known shape are sanitised instead.
pub fn suite_label_from_artifact(artifact_name: &str) -> String {
    let name = artifact_name
        .strip_prefix(ARTIFACT_PREFIX)
        .unwrap_or(artifact_name);
    let without_attempt = |part: &str| {
        part.split(ATTEMPT_MARKER)
            .next()
            .unwrap_or(part)
            .trim()
            .to_string()
    };

    if let Some((_, suite)) = name.split_once(PYTEST_MARKER) {
        return without_attempt(suite);
    }
    if let Some((_, suite)) = name.split_once(REPORT_MARKER) {
        return without_attempt(suite);
    }
    tracing::debug!(artifact = artifact_name, "artifact name has no suite marker");
    name.replace(' ', "_").replace(';', "").replace('=', "_")
}

pub fn is_ci_artifact_name(name: &str) -> bool {
    name.contains(REPORT_MARKER)
}

/// `h743` and `u575` boards get their MCU family; anything else drops the
/// `BFT_` and `_dev` decorations and is upper-cased.
pub fn board_display_name(board: &str) -> String {
    let lower = board.to_ascii_lowercase();
    if lower.contains("h743") {
        return "H743 (STM32H743)".to_string();
    }
    if lower.contains("u575") {
        return "U575 (STM32U575)".to_string();
    }
    board.replace("BFT_", "").replace("_dev", "").to_uppercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRules {
    pub board_dir_prefixes: Vec<String>,
    pub suite_dir_prefix: String,
}

impl Default for LabelRules {
    fn default() -> Self {
        Self {
            board_dir_prefixes: ["BFT_", "CFT_", "PFT_"].map(str::to_string).to_vec(),
            suite_dir_prefix: "suite_".to_string(),
        }
    }
}

impl LabelRules {
    /// Board is the first component carrying a board prefix. Suite is the
    /// first `suite_` component, then a CI artifact directory name, then the
    /// directory holding the file.
    pub fn labels_from_components(&self, dirs: &[&str]) -> (String, String) {
        let board = dirs
            .iter()
            .find(|part| {
                self.board_dir_prefixes
                    .iter()
                    .any(|prefix| !prefix.is_empty() && part.starts_with(prefix.as_str()))
            })
            .map_or_else(|| UNKNOWN_BOARD.to_string(), |part| part.to_string());

        let suite = dirs
            .iter()
            .find_map(|part| {
                part.strip_prefix(self.suite_dir_prefix.as_str())
                    .filter(|rest| !self.suite_dir_prefix.is_empty() && !rest.is_empty())
                    .map(str::to_string)
            })
            .or_else(|| {
                dirs.iter()
                    .find(|part| is_ci_artifact_name(part))
                    .map(|part| suite_label_from_artifact(part))
            })
            .or_else(|| {
                dirs.last()
                    .filter(|part| **part != board.as_str())
                    .map(|part| part.to_string())
            })
            .unwrap_or_else(|| UNKNOWN_SUITE.to_string());

        (board, suite)
    }
}
