//! Patch transactions: create, delete and replace.
//!
//! All three run the same skeleton:
//!
//! ```text
//! validate -> stale check -> match -> splice -> diff -> permission
//!          -> (denied: abort) | (approved: write -> history -> stamps)
//! ```
//!
//! They differ only in how the new content is derived, which is decided by
//! the [`EditOperation`] variant. Nothing touches the disk before the arbiter
//! approves, and history is only updated after a successful write.

use crate::edit::{atomic_write, create_parent_dirs, Splice};
use crate::error::{PatchError, Rejection};
use crate::matcher::{find_unique, MatchError};
use crate::request::{EditOperation, EditRequest, EDIT_TOOL_NAME};
use crate::sanitize::sanitize;
use crate::services::{
    DiffGenerator, DiffOutput, EditPermissionParams, HistoryService, PermissionArbiter,
    PermissionRequest, UnifiedDiff,
};
use crate::tracker::{ReadTracker, StaleError};
use crate::workspace::Workspace;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Identity of the caller on whose behalf an edit runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: String,
    pub message_id: String,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message_id: message_id.into(),
        }
    }

    fn ensure_present(&self) -> Result<(), PatchError> {
        if self.session_id.is_empty() || self.message_id.is_empty() {
            return Err(PatchError::MissingIdentity);
        }
        Ok(())
    }
}

/// Outcome of a successful patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchResult {
    #[serde(skip)]
    pub new_content: String,
    pub diff: String,
    pub additions: usize,
    pub removals: usize,
}

/// What the caller sees: a status or error line plus diff metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolResponse {
    pub content: String,
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PatchResult>,
}

impl ToolResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            metadata: None,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: PatchResult) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Internal split between "tell the caller" and "abort the call".
enum Failure {
    Rejected(Rejection),
    Fatal(PatchError),
}

impl From<Rejection> for Failure {
    fn from(e: Rejection) -> Self {
        Failure::Rejected(e)
    }
}

impl From<MatchError> for Failure {
    fn from(e: MatchError) -> Self {
        Failure::Rejected(e.into())
    }
}

impl From<StaleError> for Failure {
    fn from(e: StaleError) -> Self {
        Failure::Rejected(e.into())
    }
}

impl From<PatchError> for Failure {
    fn from(e: PatchError) -> Self {
        Failure::Fatal(e)
    }
}

/// Content before and after the patch.
struct Derived {
    old_content: String,
    new_content: String,
}

/// The edit tool: owns the collaborators a transaction needs.
pub struct EditTool {
    workspace: Workspace,
    tracker: Arc<ReadTracker>,
    permissions: Arc<dyn PermissionArbiter>,
    history: Arc<dyn HistoryService>,
    differ: Arc<dyn DiffGenerator>,
}

impl EditTool {
    pub fn new(
        workspace: Workspace,
        tracker: Arc<ReadTracker>,
        permissions: Arc<dyn PermissionArbiter>,
        history: Arc<dyn HistoryService>,
    ) -> Self {
        Self {
            workspace,
            tracker,
            permissions,
            history,
            differ: Arc::new(UnifiedDiff::default()),
        }
    }

    pub fn with_diff_generator(mut self, differ: Arc<dyn DiffGenerator>) -> Self {
        self.differ = differ;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn tracker(&self) -> &Arc<ReadTracker> {
        &self.tracker
    }

    /// Decode a JSON request and run the operation it selects.
    pub fn run(&self, ctx: &SessionContext, input: &str) -> Result<ToolResponse, PatchError> {
        match EditRequest::from_json(input) {
            Ok(request) => self.execute(ctx, &request.into_operation(&self.workspace)),
            Err(rejection) => Ok(ToolResponse::error(rejection.to_string())),
        }
    }

    pub fn create(
        &self,
        ctx: &SessionContext,
        path: impl AsRef<Path>,
        content: impl Into<String>,
    ) -> Result<ToolResponse, PatchError> {
        self.execute(
            ctx,
            &EditOperation::Create {
                path: self.workspace.resolve(path),
                content: content.into(),
            },
        )
    }

    pub fn delete(
        &self,
        ctx: &SessionContext,
        path: impl AsRef<Path>,
        pattern: impl Into<String>,
    ) -> Result<ToolResponse, PatchError> {
        self.execute(
            ctx,
            &EditOperation::Delete {
                path: self.workspace.resolve(path),
                pattern: pattern.into(),
            },
        )
    }

    pub fn replace(
        &self,
        ctx: &SessionContext,
        path: impl AsRef<Path>,
        pattern: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<ToolResponse, PatchError> {
        self.execute(
            ctx,
            &EditOperation::Replace {
                path: self.workspace.resolve(path),
                pattern: pattern.into(),
                content: content.into(),
            },
        )
    }

    /// Run one transaction. User-input problems come back as an error
    /// response; environment faults and permission denial as `Err`.
    pub fn execute(
        &self,
        ctx: &SessionContext,
        op: &EditOperation,
    ) -> Result<ToolResponse, PatchError> {
        match self.transact(ctx, op) {
            Ok(response) => Ok(response),
            Err(Failure::Rejected(rejection)) => {
                debug!(path = %op.path().display(), %rejection, "edit rejected");
                Ok(ToolResponse::error(rejection.to_string()))
            }
            Err(Failure::Fatal(err)) => Err(err),
        }
    }

    fn transact(&self, ctx: &SessionContext, op: &EditOperation) -> Result<ToolResponse, Failure> {
        ctx.ensure_present()?;
        let path = op.path();

        let derived = self.derive(op)?;
        let DiffOutput {
            diff,
            additions,
            removals,
        } = self
            .differ
            .generate(&derived.old_content, &derived.new_content, path);

        let request = PermissionRequest {
            session_id: ctx.session_id.clone(),
            path: self.workspace.permission_scope(path),
            tool_name: EDIT_TOOL_NAME.to_string(),
            action: "write".to_string(),
            description: permission_description(op),
            params: EditPermissionParams {
                file_path: path.to_path_buf(),
                diff: diff.clone(),
            },
        };
        if !self.permissions.request(&request) {
            warn!(path = %path.display(), "edit permission denied");
            return Err(PatchError::PermissionDenied {
                path: path.to_path_buf(),
            }
            .into());
        }

        if matches!(op, EditOperation::Create { .. }) {
            create_parent_dirs(path).map_err(|source| PatchError::CreateDir {
                path: path.to_path_buf(),
                source,
            })?;
        }
        atomic_write(path, derived.new_content.as_bytes()).map_err(|source| {
            PatchError::Write {
                path: path.to_path_buf(),
                source,
            }
        })?;
        info!(path = %path.display(), additions, removals, "file written");

        match op {
            EditOperation::Create { .. } => {
                self.record_new_file(&ctx.session_id, path, &derived.new_content)
            }
            _ => self.record_versions(
                &ctx.session_id,
                path,
                &derived.old_content,
                &derived.new_content,
            ),
        }

        self.tracker.record_write(path);
        self.tracker.record_read(path);

        Ok(ToolResponse::text(status_line(op)).with_metadata(PatchResult {
            new_content: derived.new_content,
            diff,
            additions,
            removals,
        }))
    }

    /// Validate preconditions and compute the new content for `op`. Pattern
    /// and content are sanitized here, whichever entry point built `op`.
    fn derive(&self, op: &EditOperation) -> Result<Derived, Failure> {
        match op {
            EditOperation::Create { path, content } => {
                ensure_absent(path)?;
                Ok(Derived {
                    old_content: String::new(),
                    new_content: sanitize(content),
                })
            }
            EditOperation::Delete { path, pattern } => {
                let old_content = self.read_fresh(path)?;
                let span = find_unique(&old_content, &sanitize(pattern))?;
                let new_content = splice(path, &old_content, Splice::delete(span))?;
                Ok(Derived {
                    old_content,
                    new_content,
                })
            }
            EditOperation::Replace {
                path,
                pattern,
                content,
            } => {
                let old_content = self.read_fresh(path)?;
                let span = find_unique(&old_content, &sanitize(pattern))?;
                let new_content =
                    splice(path, &old_content, Splice::new(span, sanitize(content)))?;
                if new_content == old_content {
                    return Err(Rejection::NoChange.into());
                }
                Ok(Derived {
                    old_content,
                    new_content,
                })
            }
        }
    }

    /// Stat the file, run the staleness guard, then read it.
    fn read_fresh(&self, path: &Path) -> Result<String, Failure> {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Rejection::FileNotFound(path.to_path_buf()).into())
            }
            Err(source) => {
                return Err(PatchError::Access {
                    path: path.to_path_buf(),
                    source,
                }
                .into())
            }
        };
        if meta.is_dir() {
            return Err(Rejection::IsDirectory(path.to_path_buf()).into());
        }

        let modified = meta.modified().map_err(|source| PatchError::Access {
            path: path.to_path_buf(),
            source,
        })?;
        self.tracker.ensure_fresh(path, modified)?;

        let bytes = fs::read(path).map_err(|source| PatchError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        String::from_utf8(bytes).map_err(|_| Rejection::NotUtf8(path.to_path_buf()).into())
    }

    fn record_new_file(&self, session_id: &str, path: &Path, content: &str) {
        if let Err(e) = self.history.create(session_id, path, "") {
            warn!(path = %path.display(), error = %e, "error creating file history");
        }
        if let Err(e) = self.history.create_version(session_id, path, content) {
            warn!(path = %path.display(), error = %e, "error creating file history version");
        }
    }

    /// Keep the version chain continuous, including edits made outside this
    /// tool between two transactions.
    fn record_versions(&self, session_id: &str, path: &Path, old: &str, new: &str) {
        let existing = match self.history.get_by_path_and_session(path, session_id) {
            Ok(existing) => existing,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "error looking up file history");
                None
            }
        };

        match existing {
            None => {
                if let Err(e) = self.history.create(session_id, path, old) {
                    warn!(path = %path.display(), error = %e, "error creating file history");
                }
            }
            Some(record) if record.content != old => {
                debug!(path = %path.display(), "file changed outside edits, storing intermediate version");
                if let Err(e) = self.history.create_version(session_id, path, old) {
                    warn!(path = %path.display(), error = %e, "error creating file history version");
                }
            }
            Some(_) => {}
        }

        if let Err(e) = self.history.create_version(session_id, path, new) {
            warn!(path = %path.display(), error = %e, "error creating file history version");
        }
    }
}

fn ensure_absent(path: &Path) -> Result<(), Failure> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Err(Rejection::IsDirectory(path.to_path_buf()).into()),
        Ok(_) => Err(Rejection::AlreadyExists(path.to_path_buf()).into()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PatchError::Access {
            path: path.to_path_buf(),
            source,
        }
        .into()),
    }
}

fn splice(path: &Path, content: &str, splice: Splice) -> Result<String, PatchError> {
    splice.apply(content).map_err(|source| PatchError::Splice {
        path: path.to_path_buf(),
        source,
    })
}

fn permission_description(op: &EditOperation) -> String {
    let path = op.path().display();
    match op {
        EditOperation::Create { .. } => format!("Create file {path}"),
        EditOperation::Delete { .. } => format!("Delete content from file {path}"),
        EditOperation::Replace { .. } => format!("Replace content in file {path}"),
    }
}

fn status_line(op: &EditOperation) -> String {
    let path = op.path().display();
    match op {
        EditOperation::Create { .. } => format!("File created: {path}"),
        EditOperation::Delete { .. } => format!("Content deleted from file: {path}"),
        EditOperation::Replace { .. } => format!("Content replaced in file: {path}"),
    }
}
