//! Path sanitization — spec §4.A.
//!
//! Normalizes a caller-supplied path into a sequence of path components
//! that is guaranteed relative, traversal-free, and rooted within the
//! working directory, or fails with [`Error::PathUnsafe`].

use std::path::{Component, Path};

use crate::error::{Error, Result};

const MAX_NAME_BYTES: usize = 255;

/// A path that has passed sanitization: a non-empty list of path
/// components, none of which is `.`, `..`, empty, or contains a `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedPath {
    components: Vec<String>,
}

impl SanitizedPath {
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// The final component — the file or directory's own name.
    pub fn file_name(&self) -> &str {
        self.components.last().expect("components is non-empty")
    }

    /// All but the final component: the directory path containing it.
    pub fn parent_components(&self) -> &[String] {
        &self.components[..self.components.len() - 1]
    }

    /// Forward-slash-joined form, for diagnostics.
    pub fn display(&self) -> String {
        self.components.join("/")
    }
}

/// Sanitize `input` against the given working directory.
///
/// `input` need not exist on disk; this is a purely lexical check. The
/// working directory is only consulted to produce a `PathUnsafe`
/// diagnostic with a meaningful absolute-path message, never to resolve
/// symlinks — a symlinked component inside `cwd` is not treated specially.
///
/// `Path::components()` does not collapse `b/..` pairs on its own (by
/// design — see its docs), so normalization is done here with a stack:
/// a `ParentDir` pops the last pushed `Normal` component instead of
/// failing immediately. Only a `..` that has nothing left to cancel
/// against — i.e. one that survives normalization — is rejected, per
/// spec.md's "lexically normalize ... reject if any component equals
/// '..'" (matching `..` only after normalization, not before).
pub fn sanitize(cwd: &Path, input: &Path) -> Result<SanitizedPath> {
    if input.as_os_str().is_empty() {
        return Err(Error::PathUnsafe {
            path: String::new(),
            reason: "empty path",
        });
    }

    let mut components: Vec<String> = Vec::new();

    for comp in input.components() {
        match comp {
            Component::Prefix(_) | Component::RootDir => {
                return Err(Error::PathUnsafe {
                    path: input.display().to_string(),
                    reason: "absolute path supplied",
                });
            }
            Component::CurDir => continue,
            Component::ParentDir => {
                if components.pop().is_none() {
                    return Err(Error::PathUnsafe {
                        path: input.display().to_string(),
                        reason: "path traversal ('..') component",
                    });
                }
            }
            Component::Normal(os) => {
                let s = os.to_str().ok_or(Error::PathUnsafe {
                    path: input.display().to_string(),
                    reason: "non-UTF-8 path component",
                })?;
                if s.is_empty() {
                    continue;
                }
                if s.len() > MAX_NAME_BYTES {
                    return Err(Error::NameTooLong { len: s.len() });
                }
                components.push(s.to_string());
            }
        }
    }

    if components.is_empty() {
        return Err(Error::PathUnsafe {
            path: input.display().to_string(),
            reason: "path has no components after normalization",
        });
    }

    // Lexical traversal check above already guarantees the result never
    // leaves `cwd`; joining here is only to surface a clear diagnostic if
    // the working directory itself cannot be resolved.
    let absolute = cwd.join(components.join("/"));
    if !absolute.starts_with(cwd) {
        return Err(Error::PathUnsafe {
            path: input.display().to_string(),
            reason: "escapes working directory",
        });
    }

    Ok(SanitizedPath { components })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn cwd() -> PathBuf {
        PathBuf::from("/work")
    }

    #[test]
    fn accepts_simple_relative_path() {
        let p = sanitize(&cwd(), Path::new("a/b/c.txt")).unwrap();
        assert_eq!(p.components(), &["a", "b", "c.txt"]);
        assert_eq!(p.file_name(), "c.txt");
        assert_eq!(p.parent_components(), &["a", "b"]);
    }

    #[test]
    fn collapses_current_dir_and_redundant_separators() {
        let p = sanitize(&cwd(), Path::new("./a/./b//c.txt")).unwrap();
        assert_eq!(p.components(), &["a", "b", "c.txt"]);
    }

    #[test]
    fn rejects_absolute_unix_path() {
        let err = sanitize(&cwd(), Path::new("/etc/passwd")).unwrap_err();
        assert!(matches!(err, Error::PathUnsafe { .. }));
    }

    #[test]
    fn rejects_traversal() {
        let err = sanitize(&cwd(), Path::new("../secrets")).unwrap_err();
        assert!(matches!(err, Error::PathUnsafe { .. }));
    }

    #[test]
    fn rejects_embedded_traversal() {
        let err = sanitize(&cwd(), Path::new("a/../../b")).unwrap_err();
        assert!(matches!(err, Error::PathUnsafe { .. }));
    }

    #[test]
    fn cancels_parent_dir_against_preceding_component() {
        // "a/b/../c" normalizes to "a/c", which stays inside cwd and
        // contains no surviving ".." component, so it must be accepted.
        let p = sanitize(&cwd(), Path::new("a/b/../c")).unwrap();
        assert_eq!(p.components(), &["a", "c"]);
    }

    #[test]
    fn cancels_multiple_parent_dirs_in_sequence() {
        let p = sanitize(&cwd(), Path::new("a/b/c/../../d")).unwrap();
        assert_eq!(p.components(), &["a", "d"]);
    }

    #[test]
    fn trailing_parent_dir_that_empties_the_path_is_rejected() {
        // "a/.." normalizes to the empty path, which is not inside cwd
        // in any meaningful sense and has no components to emit.
        let err = sanitize(&cwd(), Path::new("a/..")).unwrap_err();
        assert!(matches!(err, Error::PathUnsafe { .. }));
    }

    #[test]
    fn rejects_empty_path() {
        let err = sanitize(&cwd(), Path::new("")).unwrap_err();
        assert!(matches!(err, Error::PathUnsafe { .. }));
    }

    #[test]
    fn rejects_name_too_long() {
        let long = "a".repeat(256);
        let err = sanitize(&cwd(), Path::new(&long)).unwrap_err();
        assert!(matches!(err, Error::NameTooLong { len: 256 }));
    }

    #[test]
    fn accepts_name_at_255_bytes() {
        let at_limit = "a".repeat(255);
        let p = sanitize(&cwd(), Path::new(&at_limit)).unwrap();
        assert_eq!(p.file_name().len(), 255);
    }
}
