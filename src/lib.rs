//! Edit Patcher: single-occurrence text patching for automated editors
//!
//! An agent asks to create a file, delete a piece of text, or replace it.
//! The text to change is located while ignoring whitespace other than line
//! breaks, must occur exactly once, and is spliced back into the original
//! bytes without ever splitting a UTF-8 character.
//!
//! # Architecture
//!
//! Every delete and replace compiles down to a [`Splice`]: a byte span found
//! by [`find_unique`] plus replacement text. The [`EditTool`] wraps that in a
//! transaction with a staleness check ([`ReadTracker`]), a diff, a blocking
//! permission request, an atomic write, and a history update.
//!
//! # Safety
//!
//! - Edits require a prior read, newer than the file's modification time
//! - Ambiguous or missing matches fail instead of guessing
//! - Atomic file writes (tempfile + fsync + rename)
//! - Nothing is written before permission is granted
//!
//! # Example
//!
//! ```no_run
//! use edit_patcher::{EditTool, InMemoryHistory, PermissionRequest, ReadTracker, SessionContext, Workspace};
//! use std::sync::Arc;
//!
//! let tracker = Arc::new(ReadTracker::new());
//! let tool = EditTool::new(
//!     Workspace::new("/path/to/project"),
//!     Arc::clone(&tracker),
//!     Arc::new(|_: &PermissionRequest| true),
//!     Arc::new(InMemoryHistory::new()),
//! );
//!
//! let ctx = SessionContext::new("session-1", "message-1");
//! tracker.record_read("/path/to/project/src/main.rs");
//! match tool.replace(&ctx, "src/main.rs", "println!(\"hi\");", "println!(\"hello\");") {
//!     Ok(response) => println!("{}", response.content),
//!     Err(e) => eprintln!("Edit failed: {}", e),
//! }
//! ```

pub mod config;
pub mod edit;
pub mod error;
pub mod matcher;
pub mod normalize;
pub mod request;
pub mod sanitize;
pub mod services;
pub mod tracker;
pub mod transaction;
pub mod workspace;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, EditorConfig};
pub use edit::{atomic_write, Splice, SpliceError};
pub use error::{PatchError, Rejection};
pub use matcher::{find_unique, MatchError, MatchSpan};
pub use normalize::{strip_whitespace, PositionMap};
pub use request::{tool_info, EditOperation, EditRequest, ToolInfo, EDIT_TOOL_NAME};
pub use sanitize::sanitize;
pub use services::{
    DiffGenerator, DiffOutput, EditPermissionParams, FileRecord, HistoryError, HistoryService,
    InMemoryHistory, PermissionArbiter, PermissionRequest, UnifiedDiff,
};
pub use tracker::{FileStamps, ReadTracker, StaleError};
pub use transaction::{EditTool, PatchResult, SessionContext, ToolResponse};
pub use workspace::Workspace;
