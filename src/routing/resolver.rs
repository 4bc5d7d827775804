//! Request target to filesystem resolution.
//!
//! # Responsibilities
//! - Strip the query component from the target
//! - Normalize `.`, `..` and empty segments without ever climbing above `/`
//! - Reject targets whose `..` segments try to leave the document root
//! - Canonicalize on disk and re-check containment (symlinks)
//! - Substitute the default page for directories
//!
//! # Design Decisions
//! - Lexical rejection happens before any filesystem access
//! - The root is canonicalized once, at construction
//! - "Not found" and "rejected" are distinct outcomes (404 vs 400)

use std::io;
use std::path::{Path, PathBuf};

use crate::http::request::split_target;

/// Error type for path resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The target tried to escape the document root.
    #[error("path escapes document root")]
    PathTraversal,

    /// Nothing servable exists at the target.
    #[error("not found")]
    NotFound,
}

/// Result of lexical normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    /// Rebuilt path, always starting with `/`.
    pub path: String,
    /// Whether some `..` segment had nothing left to pop.
    pub escaped: bool,
}

/// Normalize the path component of a target.
///
/// `.` and empty segments are dropped, `..` pops the previous segment and is
/// a no-op on an empty stack (recorded in `escaped`).
pub fn normalize(path: &str) -> NormalizedPath {
    let mut stack: Vec<&str> = Vec::new();
    let mut escaped = false;

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if stack.pop().is_none() {
                    escaped = true;
                }
            }
            other => stack.push(other),
        }
    }

    let path = if stack.is_empty() {
        "/".to_string()
    } else {
        stack.iter().fold(String::new(), |mut acc, segment| {
            acc.push('/');
            acc.push_str(segment);
            acc
        })
    };

    NormalizedPath { path, escaped }
}

/// A file inside the document root, safe to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
}

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.path
    }
}

/// Maps request targets to files under a document root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    default_page: String,
}

impl PathResolver {
    /// Create a resolver. Fails if `root` cannot be canonicalized.
    pub fn new(root: &Path, default_page: impl Into<String>) -> io::Result<Self> {
        let root = std::fs::canonicalize(root)?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("document root {} is not a directory", root.display()),
            ));
        }
        Ok(Self {
            root,
            default_page: default_page.into(),
        })
    }

    /// The canonical document root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `target` (query allowed) to an existing file under the root.
    pub async fn resolve(&self, target: &str) -> Result<ResolvedPath, ResolveError> {
        let (path, _query) = split_target(target);
        let normalized = normalize(path);
        if normalized.escaped {
            tracing::warn!(target = %target, "Rejected path traversal attempt");
            return Err(ResolveError::PathTraversal);
        }

        let candidate = self.root.join(normalized.path.trim_start_matches('/'));
        let mut resolved = self.contain(&candidate).await?;

        if is_dir(&resolved).await {
            resolved = self.contain(&resolved.join(&self.default_page)).await?;
            if is_dir(&resolved).await {
                return Err(ResolveError::NotFound);
            }
        }

        Ok(ResolvedPath { path: resolved })
    }

    /// Canonicalize `candidate` and require it to stay under the root.
    async fn contain(&self, candidate: &Path) -> Result<PathBuf, ResolveError> {
        let canonical = match tokio::fs::canonicalize(candidate).await {
            Ok(path) => path,
            Err(e) => {
                tracing::debug!(path = %candidate.display(), error = %e, "Path does not resolve");
                return Err(ResolveError::NotFound);
            }
        };

        if !canonical.starts_with(&self.root) {
            tracing::warn!(
                path = %candidate.display(),
                resolved = %canonical.display(),
                "Resolved path leaves document root"
            );
            return Err(ResolveError::PathTraversal);
        }
        Ok(canonical)
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> (tempfile::TempDir, PathResolver) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "hello").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs").join("index.html"), "docs").unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        let resolver = PathResolver::new(dir.path(), "index.html").unwrap();
        (dir, resolver)
    }

    #[test]
    fn normalize_drops_dots_and_empty_segments() {
        assert_eq!(normalize("/a/./b//c/").path, "/a/b/c");
        assert_eq!(normalize("/a/b/../c").path, "/a/c");
        assert_eq!(normalize("").path, "/");
        assert_eq!(normalize("/").path, "/");
        assert_eq!(normalize("/a/..").path, "/");
        assert!(!normalize("/a/../b").escaped);
    }

    #[test]
    fn normalize_never_underflows() {
        let n = normalize("/../../etc/passwd");
        assert_eq!(n.path, "/etc/passwd");
        assert!(n.escaped);
    }

    #[test]
    fn any_depth_of_leading_parent_segments_escapes() {
        for depth in 1..32 {
            for filler in ["", "/.", "//", "/./"] {
                let mut target = String::new();
                for _ in 0..depth {
                    target.push_str(filler);
                    target.push_str("/..");
                }
                target.push_str("/etc/passwd");
                assert!(normalize(&target).escaped, "{target}");
            }
        }
    }

    #[tokio::test]
    async fn resolves_files_and_default_pages() {
        let (_dir, resolver) = fixture();

        let file = resolver.resolve("/index.html").await.unwrap();
        assert_eq!(file.as_path(), resolver.root().join("index.html"));

        let root = resolver.resolve("/").await.unwrap();
        assert_eq!(root.as_path(), resolver.root().join("index.html"));

        let docs = resolver.resolve("/docs?page=2").await.unwrap();
        assert_eq!(docs.as_path(), resolver.root().join("docs").join("index.html"));
    }

    #[tokio::test]
    async fn missing_targets_are_not_found() {
        let (_dir, resolver) = fixture();
        assert!(matches!(
            resolver.resolve("/nope.html").await,
            Err(ResolveError::NotFound)
        ));
        // Directory without a default page
        assert!(matches!(
            resolver.resolve("/empty/").await,
            Err(ResolveError::NotFound)
        ));
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let (_dir, resolver) = fixture();
        for target in ["/../../etc/passwd", "/docs/../../x", "/./../index.html", "//..//.."] {
            assert!(
                matches!(resolver.resolve(target).await, Err(ResolveError::PathTraversal)),
                "{target}"
            );
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_out_of_root_are_rejected() {
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), "secret").unwrap();
        let (dir, resolver) = fixture();
        std::os::unix::fs::symlink(outside.path().join("secret.txt"), dir.path().join("leak.txt"))
            .unwrap();

        assert!(matches!(
            resolver.resolve("/leak.txt").await,
            Err(ResolveError::PathTraversal)
        ));
    }
}
