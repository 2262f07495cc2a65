use crate::matcher::MatchSpan;
use std::fs;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Mode bits for files written by a patch.
pub const FILE_MODE: u32 = 0o644;
/// Mode bits for parent directories created by a patch.
pub const DIR_MODE: u32 = 0o755;

/// The splice primitive: replace the bytes in `span` with `new_text`.
///
/// Every patch transaction compiles down to one of these. Deletion is a splice
/// with empty text.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Splice does nothing until apply() is called"]
pub struct Splice {
    pub span: MatchSpan,
    pub new_text: String,
}

#[derive(Error, Debug)]
pub enum SpliceError {
    #[error("Invalid byte range: [{byte_start}, {byte_end}) in content of length {content_len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        content_len: usize,
    },

    #[error("Byte offset {offset} is not on a UTF-8 character boundary")]
    NotCharBoundary { offset: usize },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Splice {
    pub fn new(span: MatchSpan, new_text: impl Into<String>) -> Self {
        Self {
            span,
            new_text: new_text.into(),
        }
    }

    pub fn delete(span: MatchSpan) -> Self {
        Self::new(span, String::new())
    }

    fn validate(&self, content: &str) -> Result<(), SpliceError> {
        let MatchSpan { start, end } = self.span;
        if start > end || end > content.len() {
            return Err(SpliceError::InvalidByteRange {
                byte_start: start,
                byte_end: end,
                content_len: content.len(),
            });
        }
        for offset in [start, end] {
            if !content.is_char_boundary(offset) {
                return Err(SpliceError::NotCharBoundary { offset });
            }
        }
        Ok(())
    }

    /// Produce the spliced content. The input is left untouched.
    pub fn apply(&self, content: &str) -> Result<String, SpliceError> {
        self.validate(content)?;

        let mut out =
            String::with_capacity(content.len() - self.span.len() + self.new_text.len());
        out.push_str(&content[..self.span.start]);
        out.push_str(&self.new_text);
        out.push_str(&content[self.span.end..]);
        Ok(out)
    }
}

/// Create the missing ancestors of `path` with [`DIR_MODE`].
pub fn create_parent_dirs(path: &Path) -> Result<(), SpliceError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(parent)?;
    Ok(())
}

/// Atomic file write: tempfile + fsync + chmod + rename.
///
/// Either the full content lands at `path` or the previous file is untouched.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<(), SpliceError> {
    // Tempfile in the same directory so the rename never crosses filesystems
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        Some(_) => Path::new("."),
        None => {
            return Err(SpliceError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no parent directory",
            )))
        }
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(FILE_MODE))?;
    }

    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
