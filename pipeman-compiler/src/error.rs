//! Error types for the pipeline compiler

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;

/// Fatal errors of a compile call
///
/// Any of these aborts the whole call; no partial document or pipeline list
/// is returned. Soft selection problems are reported as
/// [`SelectionDiagnostic`](crate::select::SelectionDiagnostic) instead.
#[derive(Debug, Error)]
pub enum CompileError {
    /// A directory of the fragment tree could not be walked
    #[error("Failed to read directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A fragment file could not be read
    #[error("Failed to read fragment {}: {source}", .path.display())]
    ReadFragment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A fragment file is not valid YAML
    #[error("Failed to parse fragment {}: {source}", .path.display())]
    ParseFragment {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A fragment parsed, but its top level is not a mapping
    #[error("Fragment {} must contain a mapping at the top level", .path.display())]
    InvalidFragment { path: PathBuf },

    /// A selected pipeline does not fit the typed pipeline shape
    #[error("Pipeline '{pipeline}' has an invalid structure: {source}")]
    Convert {
        pipeline: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl CompileError {
    /// Check if this error comes from loading the fragment tree
    pub fn is_merge_error(&self) -> bool {
        !matches!(self, Self::Convert { .. })
    }
}
