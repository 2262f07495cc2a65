//! Read/write timestamps per file, and the staleness guard built on them.
//!
//! A caller may only edit a file it has read, and only while its read is at
//! least as new as the file's on-disk modification time.

use chrono::{DateTime, SecondsFormat, Utc};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Last observed read and write of one path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStamps {
    pub last_read: Option<SystemTime>,
    pub last_write: Option<SystemTime>,
}

/// Process-wide keyed store of [`FileStamps`].
///
/// Share one instance (behind an `Arc`) between every transaction. Updates to
/// a single path are atomic with respect to reads of that path; different
/// paths never contend on the same shard lock for long.
#[derive(Debug, Default)]
pub struct ReadTracker {
    entries: DashMap<PathBuf, FileStamps>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StaleError {
    #[error("you must read the file before editing it. Use the View tool first")]
    NotRead,

    #[error(
        "file {} has been modified since it was last read (mod time: {}, last read: {})",
        .path.display(),
        format_time(.modified),
        format_time(.last_read)
    )]
    Modified {
        path: PathBuf,
        modified: SystemTime,
        last_read: SystemTime,
    },
}

impl ReadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_read(&self, path: impl AsRef<Path>) {
        self.record_read_at(path, SystemTime::now());
    }

    pub fn record_read_at(&self, path: impl AsRef<Path>, at: SystemTime) {
        self.entries
            .entry(path.as_ref().to_path_buf())
            .or_default()
            .last_read = Some(at);
    }

    pub fn record_write(&self, path: impl AsRef<Path>) {
        self.record_write_at(path, SystemTime::now());
    }

    pub fn record_write_at(&self, path: impl AsRef<Path>, at: SystemTime) {
        self.entries
            .entry(path.as_ref().to_path_buf())
            .or_default()
            .last_write = Some(at);
    }

    pub fn last_read(&self, path: impl AsRef<Path>) -> Option<SystemTime> {
        self.stamps(path).last_read
    }

    pub fn last_write(&self, path: impl AsRef<Path>) -> Option<SystemTime> {
        self.stamps(path).last_write
    }

    pub fn stamps(&self, path: impl AsRef<Path>) -> FileStamps {
        self.entries
            .get(path.as_ref())
            .map(|entry| *entry.value())
            .unwrap_or_default()
    }

    /// Reject edits on files never read, or modified after the last read.
    pub fn ensure_fresh(&self, path: &Path, modified: SystemTime) -> Result<(), StaleError> {
        let last_read = self.last_read(path).ok_or(StaleError::NotRead)?;
        if modified > last_read {
            return Err(StaleError::Modified {
                path: path.to_path_buf(),
                modified,
                last_read,
            });
        }
        Ok(())
    }
}

fn format_time(time: &SystemTime) -> String {
    DateTime::<Utc>::from(*time).to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_unread_path_is_rejected() {
        let tracker = ReadTracker::new();
        let result = tracker.ensure_fresh(Path::new("/tmp/a.rs"), SystemTime::now());
        assert_eq!(result, Err(StaleError::NotRead));
    }

    #[test]
    fn test_fresh_read_passes() {
        let tracker = ReadTracker::new();
        let modified = SystemTime::now();
        tracker.record_read_at("/tmp/a.rs", modified + Duration::from_secs(1));
        assert!(tracker.ensure_fresh(Path::new("/tmp/a.rs"), modified).is_ok());
        // Equal timestamps are not stale
        tracker.record_read_at("/tmp/a.rs", modified);
        assert!(tracker.ensure_fresh(Path::new("/tmp/a.rs"), modified).is_ok());
    }

    #[test]
    fn test_modified_after_read_is_stale() {
        let tracker = ReadTracker::new();
        let read = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        tracker.record_read_at("/tmp/a.rs", read);

        let err = tracker
            .ensure_fresh(Path::new("/tmp/a.rs"), read + Duration::from_secs(60))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("has been modified since it was last read"));
        assert!(message.contains("mod time: 2023-11-14T22:14:20Z"));
        assert!(message.contains("last read: 2023-11-14T22:13:20Z"));
    }

    #[test]
    fn test_read_and_write_are_tracked_separately() {
        let tracker = ReadTracker::new();
        tracker.record_write("/tmp/b.rs");
        assert!(tracker.last_read("/tmp/b.rs").is_none());
        assert!(tracker.last_write("/tmp/b.rs").is_some());
        tracker.record_read("/tmp/b.rs");
        assert!(tracker.last_read("/tmp/b.rs").is_some());
    }

    #[test]
    fn test_concurrent_updates_on_distinct_paths() {
        let tracker = Arc::new(ReadTracker::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    for _ in 0..100 {
                        tracker.record_read(format!("/tmp/file-{i}.rs"));
                        tracker.record_write(format!("/tmp/file-{i}.rs"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        for i in 0..8 {
            let stamps = tracker.stamps(format!("/tmp/file-{i}.rs"));
            assert!(stamps.last_read.is_some());
            assert!(stamps.last_write.is_some());
        }
    }
}
