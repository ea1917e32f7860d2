use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use path_slash::PathExt;

use crate::error::ReportError;
use crate::labels::LabelRules;

/// Include/exclude globs matched against slash-separated paths relative to
/// the discovery root. An empty include list admits everything.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl PathFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, ReportError> {
        let include = if include.is_empty() {
            None
        } else {
            Some(build_globset(include)?)
        };
        Ok(Self {
            include,
            exclude: build_globset(exclude)?,
        })
    }

    pub fn allows(&self, relative: &str) -> bool {
        let included = self
            .include
            .as_ref()
            .is_none_or(|set| set.is_match(relative));
        included && !self.exclude.is_match(relative)
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self {
            include: None,
            exclude: GlobSet::empty(),
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ReportError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|err| ReportError::InvalidPattern {
            pattern: pattern.clone(),
            message: err.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|err| ReportError::InvalidPattern {
        pattern: patterns.join(","),
        message: err.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredArtifact {
    pub path: PathBuf,
    pub relative: String,
    pub board: String,
    pub suite: String,
}

/// Every regular file under `root` that the filter admits, labelled from its
/// directory components and sorted by relative path.
pub fn discover_artifacts(
    root: &Path,
    filter: &PathFilter,
    rules: &LabelRules,
) -> Vec<DiscoveredArtifact> {
    let mut found = ignore::WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build()
        .filter_map(Result::ok)
        .filter(|dent| dent.file_type().is_some_and(|t| t.is_file()))
        .map(|dent| dent.into_path())
        .filter(|path| !is_config_file(path))
        .filter_map(|path| {
            let relative = path.strip_prefix(root).ok()?.to_slash_lossy().to_string();
            if !filter.allows(&relative) {
                tracing::debug!(path = %relative, "excluded by include/exclude globs");
                return None;
            }
            let dirs = relative.split('/').collect::<Vec<_>>();
            let dirs = &dirs[..dirs.len().saturating_sub(1)];
            let (board, suite) = rules.labels_from_components(dirs);
            Some(DiscoveredArtifact {
                path,
                relative,
                board,
                suite,
            })
        })
        .collect::<Vec<_>>();
    found.sort_by(|a, b| a.relative.cmp(&b.relative));
    found
}

fn is_config_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("boardreport.") || name.starts_with(".boardreportrc"))
}
