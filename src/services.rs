//! Collaborators a patch transaction calls out to.
//!
//! Each is a trait so a host can plug in its own permission prompt, history
//! store and diff renderer. Simple implementations are provided for tests and
//! for the command-line wrapper.

use dashmap::DashMap;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Structured payload attached to an edit permission request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditPermissionParams {
    pub file_path: PathBuf,
    pub diff: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionRequest {
    pub session_id: String,
    /// Directory the grant applies to
    pub path: PathBuf,
    pub tool_name: String,
    pub action: String,
    pub description: String,
    pub params: EditPermissionParams,
}

/// Blocking approve/deny decision for a pending write.
///
/// Implementations may block for as long as they like; any timeout policy
/// belongs to the arbiter.
pub trait PermissionArbiter: Send + Sync {
    fn request(&self, request: &PermissionRequest) -> bool;
}

impl<F> PermissionArbiter for F
where
    F: Fn(&PermissionRequest) -> bool + Send + Sync,
{
    fn request(&self, request: &PermissionRequest) -> bool {
        self(request)
    }
}

/// One stored version of a file within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub session_id: String,
    pub path: PathBuf,
    pub content: String,
    /// 0 for the initial record, incremented per version
    pub version: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history for {path} in session {session_id} already exists")]
    AlreadyExists { session_id: String, path: String },

    #[error("no history for {path} in session {session_id}")]
    NotFound { session_id: String, path: String },

    #[error("history backend failure: {0}")]
    Backend(String),
}

/// Per-session version history of edited files.
pub trait HistoryService: Send + Sync {
    fn create(
        &self,
        session_id: &str,
        path: &Path,
        initial_content: &str,
    ) -> Result<FileRecord, HistoryError>;

    fn create_version(
        &self,
        session_id: &str,
        path: &Path,
        content: &str,
    ) -> Result<FileRecord, HistoryError>;

    /// Latest version for `path` in `session_id`, if any history exists.
    fn get_by_path_and_session(
        &self,
        path: &Path,
        session_id: &str,
    ) -> Result<Option<FileRecord>, HistoryError>;
}

/// History kept in process memory, keyed by session and path.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    records: DashMap<(String, PathBuf), Vec<FileRecord>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every version recorded for `path` in `session_id`, oldest first.
    pub fn versions(&self, session_id: &str, path: &Path) -> Vec<FileRecord> {
        self.records
            .get(&(session_id.to_string(), path.to_path_buf()))
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

impl HistoryService for InMemoryHistory {
    fn create(
        &self,
        session_id: &str,
        path: &Path,
        initial_content: &str,
    ) -> Result<FileRecord, HistoryError> {
        let key = (session_id.to_string(), path.to_path_buf());
        let mut entry = self.records.entry(key).or_default();
        if !entry.is_empty() {
            return Err(HistoryError::AlreadyExists {
                session_id: session_id.to_string(),
                path: path.display().to_string(),
            });
        }
        let record = FileRecord {
            session_id: session_id.to_string(),
            path: path.to_path_buf(),
            content: initial_content.to_string(),
            version: 0,
        };
        entry.push(record.clone());
        Ok(record)
    }

    fn create_version(
        &self,
        session_id: &str,
        path: &Path,
        content: &str,
    ) -> Result<FileRecord, HistoryError> {
        let key = (session_id.to_string(), path.to_path_buf());
        let not_found = || HistoryError::NotFound {
            session_id: session_id.to_string(),
            path: path.display().to_string(),
        };
        let mut entry = self.records.get_mut(&key).ok_or_else(not_found)?;
        let version = entry.last().map(|r| r.version + 1).ok_or_else(not_found)?;
        let record = FileRecord {
            session_id: session_id.to_string(),
            path: path.to_path_buf(),
            content: content.to_string(),
            version,
        };
        entry.push(record.clone());
        Ok(record)
    }

    fn get_by_path_and_session(
        &self,
        path: &Path,
        session_id: &str,
    ) -> Result<Option<FileRecord>, HistoryError> {
        Ok(self
            .records
            .get(&(session_id.to_string(), path.to_path_buf()))
            .and_then(|entry| entry.last().cloned()))
    }
}

/// Rendered diff plus line counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffOutput {
    pub diff: String,
    pub additions: usize,
    pub removals: usize,
}

/// Pure old/new text comparison.
pub trait DiffGenerator: Send + Sync {
    fn generate(&self, old: &str, new: &str, path: &Path) -> DiffOutput;
}

/// Line-based unified diff on top of `similar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnifiedDiff {
    pub context_lines: usize,
}

impl Default for UnifiedDiff {
    fn default() -> Self {
        Self { context_lines: 3 }
    }
}

impl DiffGenerator for UnifiedDiff {
    fn generate(&self, old: &str, new: &str, path: &Path) -> DiffOutput {
        let diff = TextDiff::from_lines(old, new);

        let (mut additions, mut removals) = (0, 0);
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => additions += 1,
                ChangeTag::Delete => removals += 1,
                ChangeTag::Equal => {}
            }
        }

        let display = path.display();
        let rendered = diff
            .unified_diff()
            .context_radius(self.context_lines)
            .header(&format!("a/{display}"), &format!("b/{display}"))
            .to_string();

        DiffOutput {
            diff: rendered,
            additions,
            removals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unified_diff_counts() {
        let out = UnifiedDiff::default().generate(
            "line1\nold_text\nline3\n",
            "line1\nnew_text\nline3\nline4\n",
            Path::new("src/a.rs"),
        );
        assert_eq!(out.additions, 2);
        assert_eq!(out.removals, 1);
        assert!(out.diff.contains("--- a/src/a.rs"));
        assert!(out.diff.contains("+++ b/src/a.rs"));
        assert!(out.diff.contains("-old_text"));
        assert!(out.diff.contains("+new_text"));
    }

    #[test]
    fn test_unified_diff_of_creation() {
        let out = UnifiedDiff::default().generate("", "a\nb\n", Path::new("new.txt"));
        assert_eq!(out.additions, 2);
        assert_eq!(out.removals, 0);
    }

    #[test]
    fn test_identical_text_has_empty_diff() {
        let out = UnifiedDiff::default().generate("same\n", "same\n", Path::new("x"));
        assert_eq!(out.additions, 0);
        assert_eq!(out.removals, 0);
        assert!(!out.diff.contains("@@"));
    }

    #[test]
    fn test_history_versions_chain() {
        let history = InMemoryHistory::new();
        let path = Path::new("/w/a.rs");
        assert_eq!(history.get_by_path_and_session(path, "s1").unwrap(), None);

        history.create("s1", path, "v0").unwrap();
        history.create_version("s1", path, "v1").unwrap();
        let latest = history.get_by_path_and_session(path, "s1").unwrap().unwrap();
        assert_eq!(latest.content, "v1");
        assert_eq!(latest.version, 1);

        // Sessions are isolated
        assert_eq!(history.get_by_path_and_session(path, "s2").unwrap(), None);
    }

    #[test]
    fn test_history_errors() {
        let history = InMemoryHistory::new();
        let path = Path::new("/w/a.rs");
        assert!(matches!(
            history.create_version("s1", path, "x"),
            Err(HistoryError::NotFound { .. })
        ));
        history.create("s1", path, "").unwrap();
        assert!(matches!(
            history.create("s1", path, ""),
            Err(HistoryError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_closure_arbiter() {
        let deny_all = |_: &PermissionRequest| false;
        let request = PermissionRequest {
            session_id: "s".into(),
            path: PathBuf::from("/w"),
            tool_name: "edit".into(),
            action: "write".into(),
            description: "Create file /w/a".into(),
            params: EditPermissionParams {
                file_path: PathBuf::from("/w/a"),
                diff: String::new(),
            },
        };
        assert!(!deny_all.request(&request));
    }
}
