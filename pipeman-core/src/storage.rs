//! Artifact and cache storage layout
//!
//! Bucket objects live under
//! `<basePath>/<artifacts|cache>/<sha256(project)>/[<commit>/]<archive>`.
//! Artifacts are scoped to a commit; the cache is shared by every commit of
//! a project.

use sha2::{Digest, Sha256};
use std::fmt;

/// Which kind of bucket content a step transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Artifacts,
    Cache,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Artifacts => "artifacts",
            StorageKind::Cache => "cache",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hex digest identifying a project in the bucket
pub fn project_hash(project: &str) -> String {
    format!("{:x}", Sha256::digest(project.as_bytes()))
}

/// Bucket prefix under which the archives for one transfer are stored
///
/// # Example
/// ```
/// use pipeman_core::storage::{object_prefix, StorageKind};
///
/// let prefix = object_prefix("pipe-manager", StorageKind::Cache, "git@example.com:app.git", "abc123");
/// assert!(prefix.starts_with("pipe-manager/cache/"));
/// assert!(!prefix.ends_with("abc123"));
/// ```
pub fn object_prefix(base_path: &str, kind: StorageKind, project: &str, commit: &str) -> String {
    let mut segments = Vec::with_capacity(4);

    let base = base_path.trim_matches('/');
    if !base.is_empty() {
        segments.push(base.to_string());
    }
    segments.push(kind.as_str().to_string());
    segments.push(project_hash(project));
    if kind == StorageKind::Artifacts && !commit.is_empty() {
        segments.push(commit.to_string());
    }

    segments.join("/")
}
