//! Typed decoding of edit requests and dispatch to an [`EditOperation`].

use crate::error::Rejection;
use crate::workspace::Workspace;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

pub const EDIT_TOOL_NAME: &str = "edit";

const EDIT_DESCRIPTION: &str = "Edits files by replacing text, creating new files, or deleting content.

Whitespace other than line breaks is ignored when locating old_string, but old_string must \
identify exactly one location in the file. Read the file before editing it.

Special cases:
- To create a new file: provide file_path and new_string, leave old_string empty
- To delete content: provide file_path and old_string, leave new_string empty";

/// Wire shape of a request. Every field is optional here so that a missing
/// field can be reported by name instead of as a parse failure.
#[derive(Debug, Deserialize)]
struct RawEditParams {
    file_path: Option<String>,
    old_string: Option<String>,
    new_string: Option<String>,
}

/// A validated edit request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRequest {
    pub file_path: String,
    pub old_string: String,
    pub new_string: String,
}

/// One patch to perform. The path is already resolved against the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    Create {
        path: PathBuf,
        content: String,
    },
    Delete {
        path: PathBuf,
        pattern: String,
    },
    Replace {
        path: PathBuf,
        pattern: String,
        content: String,
    },
}

impl EditRequest {
    /// Decode and validate a JSON payload.
    pub fn from_json(input: &str) -> Result<Self, Rejection> {
        let raw: RawEditParams = serde_json::from_str(input)
            .map_err(|e| Rejection::InvalidParameters(e.to_string()))?;

        let file_path = raw
            .file_path
            .filter(|p| !p.trim().is_empty())
            .ok_or(Rejection::MissingField("file_path"))?;
        let old_string = raw.old_string.ok_or(Rejection::MissingField("old_string"))?;
        let new_string = raw.new_string.ok_or(Rejection::MissingField("new_string"))?;

        Ok(Self {
            file_path,
            old_string,
            new_string,
        })
    }

    /// Resolve the path and pick the operation from the raw strings: a blank
    /// `old_string` creates, a blank `new_string` deletes, anything else
    /// replaces. A pattern that is only noise still selects a match-based
    /// operation, so it fails to match instead of creating a file.
    pub fn into_operation(self, workspace: &Workspace) -> EditOperation {
        let path = workspace.resolve(&self.file_path);

        if self.old_string.trim().is_empty() {
            EditOperation::Create {
                path,
                content: self.new_string,
            }
        } else if self.new_string.trim().is_empty() {
            EditOperation::Delete {
                path,
                pattern: self.old_string,
            }
        } else {
            EditOperation::Replace {
                path,
                pattern: self.old_string,
                content: self.new_string,
            }
        }
    }
}

impl EditOperation {
    pub fn path(&self) -> &Path {
        match self {
            EditOperation::Create { path, .. }
            | EditOperation::Delete { path, .. }
            | EditOperation::Replace { path, .. } => path,
        }
    }
}

/// Name, description and parameter schema for an agent tool registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
    pub required: Vec<&'static str>,
}

pub fn tool_info() -> ToolInfo {
    ToolInfo {
        name: EDIT_TOOL_NAME,
        description: EDIT_DESCRIPTION,
        parameters: json!({
            "file_path": {
                "type": "string",
                "description": "The path to the file to modify",
            },
            "old_string": {
                "type": "string",
                "description": "The text to replace",
            },
            "new_string": {
                "type": "string",
                "description": "The text to replace it with",
            },
        }),
        required: vec!["file_path", "old_string", "new_string"],
    }
}
