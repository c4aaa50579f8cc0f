//! Document merger
//!
//! Pipeline definitions are split across YAML fragments in a directory tree.
//! This module loads every fragment in a fixed order and deep-merges them
//! into one [`PipelineDocument`]:
//! - mappings present on both sides merge recursively
//! - any other value (scalar, sequence, or a mapping meeting a non-mapping)
//!   is replaced by the later fragment's value
//!
//! Fragments are visited depth-first with the entries of each directory
//! sorted by file name, so the result does not depend on filesystem order.

use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{CompileError, Result};

/// Reserved top-level key holding defaults shared by every pipeline
pub const GLOBAL_KEY: &str = "global";

const FRAGMENT_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// The merged view of every fragment: pipeline name to pipeline node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineDocument {
    root: Mapping,
}

impl PipelineDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mapping(root: Mapping) -> Self {
        Self { root }
    }

    /// Parses a single YAML string as a whole document
    ///
    /// An empty string yields an empty document.
    pub fn from_yaml(source: &str) -> std::result::Result<Self, serde_yaml::Error> {
        let root: Option<Mapping> = serde_yaml::from_str(source)?;
        Ok(Self::from_mapping(root.unwrap_or_default()))
    }

    /// Deep-merges one fragment on top of the document
    pub fn merge_fragment(&mut self, fragment: Mapping) {
        deep_merge(&mut self.root, fragment);
    }

    /// The `global` defaults, if present and a mapping
    pub fn global(&self) -> Option<&Mapping> {
        self.root.get(GLOBAL_KEY).and_then(Value::as_mapping)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.root.get(name)
    }

    /// Pipeline entries sorted by name, `global` excluded
    ///
    /// Entries with non-string keys cannot be pipelines and are skipped.
    pub fn pipelines(&self) -> Vec<(&str, &Value)> {
        let mut entries: Vec<(&str, &Value)> = self
            .root
            .iter()
            .filter_map(|(key, value)| key.as_str().map(|name| (name, value)))
            .filter(|(name, _)| *name != GLOBAL_KEY)
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.root
    }

    pub fn into_mapping(self) -> Mapping {
        self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

/// Recursively merges `src` into `dst`
///
/// Keys only in `dst` are kept, keys only in `src` are added. When both
/// sides hold a mapping the merge descends; otherwise `src` wins.
pub fn deep_merge(dst: &mut Mapping, src: Mapping) {
    for (key, incoming) in src {
        match incoming {
            Value::Mapping(incoming) => {
                if let Some(Value::Mapping(existing)) = dst.get_mut(&key) {
                    deep_merge(existing, incoming);
                    continue;
                }
                dst.insert(key, Value::Mapping(incoming));
            }
            other => {
                dst.insert(key, other);
            }
        }
    }
}

/// Loads and merges every fragment below `root`
///
/// # Arguments
/// * `root` - Directory holding the pipeline fragments
///
/// # Returns
/// The merged document. A tree with no fragments yields an empty document.
///
/// # Errors
/// Returns an error if:
/// - `root` or one of its subdirectories cannot be read
/// - A fragment cannot be read or is not valid YAML
/// - A fragment's top level is neither a mapping nor empty
///
/// Any error aborts the load; no partially merged document is returned.
pub fn load_tree(root: &Path) -> Result<PipelineDocument> {
    let mut document = PipelineDocument::new();
    let mut fragments = 0usize;

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|err| CompileError::ReadDir {
            path: err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source: err.into(),
        })?;

        if !entry.file_type().is_file() || !is_fragment(entry.path()) {
            continue;
        }

        if let Some(fragment) = read_fragment(entry.path())? {
            debug!("Merging fragment {}", entry.path().display());
            document.merge_fragment(fragment);
            fragments += 1;
        }
    }

    info!(
        "Merged {} fragment(s) from {} into {} top-level entries",
        fragments,
        root.display(),
        document.as_mapping().len()
    );

    Ok(document)
}

fn is_fragment(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FRAGMENT_EXTENSIONS.contains(&ext))
}

/// Reads one fragment; `None` for an empty file
fn read_fragment(path: &Path) -> Result<Option<Mapping>> {
    let source = fs::read_to_string(path).map_err(|source| CompileError::ReadFragment {
        path: path.to_path_buf(),
        source,
    })?;

    let value: Value =
        serde_yaml::from_str(&source).map_err(|source| CompileError::ParseFragment {
            path: path.to_path_buf(),
            source,
        })?;

    match value {
        Value::Null => Ok(None),
        Value::Mapping(mapping) => Ok(Some(mapping)),
        _ => Err(CompileError::InvalidFragment {
            path: path.to_path_buf(),
        }),
    }
}
