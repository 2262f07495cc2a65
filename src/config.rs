//! TOML configuration for the edit tool.
//!
//! ```toml
//! [workspace]
//! root = "/path/to/project"
//!
//! [diff]
//! context_lines = 3
//! ```

use crate::services::UnifiedDiff;
use crate::workspace::Workspace;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const MAX_CONTEXT_LINES: usize = 100;

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    #[serde(default)]
    pub workspace: WorkspaceSection,
    #[serde(default)]
    pub diff: DiffSection,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct WorkspaceSection {
    /// Working root; the process cwd when absent
    pub root: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DiffSection {
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
}

impl Default for DiffSection {
    fn default() -> Self {
        Self {
            context_lines: default_context_lines(),
        }
    }
}

fn default_context_lines() -> usize {
    3
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("workspace.root must not be empty")]
    EmptyRoot,
    #[error("diff.context_lines is {value}, maximum is {max}")]
    ContextTooLarge { value: usize, max: usize },
}

impl EditorConfig {
    pub fn validate(&self) -> Result<(), ValidationIssue> {
        if let Some(root) = &self.workspace.root {
            if root.as_os_str().is_empty() {
                return Err(ValidationIssue::EmptyRoot);
            }
        }
        if self.diff.context_lines > MAX_CONTEXT_LINES {
            return Err(ValidationIssue::ContextTooLarge {
                value: self.diff.context_lines,
                max: MAX_CONTEXT_LINES,
            });
        }
        Ok(())
    }

    /// The configured workspace, falling back to the current directory.
    pub fn workspace(&self) -> std::io::Result<Workspace> {
        match &self.workspace.root {
            Some(root) => Ok(Workspace::new(root)),
            None => Workspace::current(),
        }
    }

    pub fn diff_generator(&self) -> UnifiedDiff {
        UnifiedDiff {
            context_lines: self.diff.context_lines,
        }
    }
}

/// Errors from loading an editor config. `origin` is the file the TOML came
/// from, absent for in-memory input.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read editor config from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse editor config TOML{}: {source}", describe_origin(.origin))]
    Toml {
        origin: Option<PathBuf>,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("invalid editor config{}: {source}", describe_origin(.origin))]
    Validation {
        origin: Option<PathBuf>,
        #[source]
        source: ValidationIssue,
    },
}

fn describe_origin(origin: &Option<PathBuf>) -> String {
    origin
        .as_ref()
        .map(|path| format!(" ({})", path.display()))
        .unwrap_or_default()
}

fn parse(input: &str, origin: Option<&Path>) -> Result<EditorConfig, ConfigError> {
    let config: EditorConfig =
        toml_edit::de::from_str(input).map_err(|source| ConfigError::Toml {
            origin: origin.map(Path::to_path_buf),
            source,
        })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation {
            origin: origin.map(Path::to_path_buf),
            source,
        })?;
    Ok(config)
}

pub fn load_from_str(input: &str) -> Result<EditorConfig, ConfigError> {
    parse(input, None)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<EditorConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents, Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = load_from_str("").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.diff.context_lines, 3);
        assert!(config.workspace.root.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = load_from_str(
            r#"
[workspace]
root = "/srv/project"

[diff]
context_lines = 5
"#,
        )
        .unwrap();
        assert_eq!(config.workspace.root, Some(PathBuf::from("/srv/project")));
        assert_eq!(config.diff_generator().context_lines, 5);
        assert_eq!(
            config.workspace().unwrap().root(),
            Path::new("/srv/project")
        );
    }

    #[test]
    fn test_invalid_toml() {
        let err = load_from_str("[diff\ncontext_lines = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Toml { origin: None, .. }));
    }

    #[test]
    fn test_validation_failure_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.toml");
        fs::write(&path, "[diff]\ncontext_lines = 1000\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { origin: Some(_), .. }));
        assert_eq!(
            err.to_string(),
            format!(
                "invalid editor config ({}): diff.context_lines is 1000, maximum is 100",
                path.display()
            )
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_missing_file() {
        let err = load_from_path("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
