use std::path::{Component, Path, PathBuf};

/// The working root edits are resolved against and permissions are scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Absolute path to the working root
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Workspace rooted at the process working directory.
    pub fn current() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    /// Resolve a caller-supplied path. Relative paths are joined onto the
    /// root; absolute paths are taken as given. `.` and `..` are folded
    /// lexically so the result can be compared against the root.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        normalize_lexically(&self.root.join(path))
    }

    /// Directory a permission request for `file` is scoped to: the working
    /// root when `file` lives under it, otherwise the file's parent directory.
    pub fn permission_scope(&self, file: &Path) -> PathBuf {
        if file.starts_with(&self.root) {
            return self.root.clone();
        }
        match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => self.root.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Fold `.` and `..` without touching the filesystem. `..` at the root stays
/// at the root; leading `..` of a relative path is kept.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(Component::ParentDir),
            },
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_path() {
        let ws = Workspace::new("/work/project");
        assert_eq!(
            ws.resolve("src/main.rs"),
            PathBuf::from("/work/project/src/main.rs")
        );
    }

    #[test]
    fn test_resolve_absolute_path() {
        let ws = Workspace::new("/work/project");
        assert_eq!(ws.resolve("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn test_resolve_folds_parent_components() {
        let ws = Workspace::new("/work/project");
        assert_eq!(
            ws.resolve("../outside.txt"),
            PathBuf::from("/work/outside.txt")
        );
        assert_eq!(
            ws.resolve("./src/../lib.rs"),
            PathBuf::from("/work/project/lib.rs")
        );
        assert_eq!(ws.resolve("/../../etc/hosts"), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn test_scope_for_parent_escape() {
        let ws = Workspace::new("/work/project");
        let file = ws.resolve("../outside.txt");
        assert_eq!(ws.permission_scope(&file), PathBuf::from("/work"));
    }

    #[test]
    fn test_scope_inside_workspace() {
        let ws = Workspace::new("/work/project");
        assert_eq!(
            ws.permission_scope(Path::new("/work/project/src/deep/lib.rs")),
            PathBuf::from("/work/project")
        );
    }

    #[test]
    fn test_scope_outside_workspace() {
        let ws = Workspace::new("/work/project");
        assert_eq!(
            ws.permission_scope(Path::new("/tmp/scratch/notes.txt")),
            PathBuf::from("/tmp/scratch")
        );
    }

    #[test]
    fn test_scope_sibling_with_shared_prefix() {
        // Component-wise prefix, not string prefix
        let ws = Workspace::new("/work/project");
        assert_eq!(
            ws.permission_scope(Path::new("/work/project-old/a.rs")),
            PathBuf::from("/work/project-old")
        );
    }
}
