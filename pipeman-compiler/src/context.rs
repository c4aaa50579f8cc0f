//! Compile context
//!
//! Everything the normalizer needs from the outside world, passed explicitly
//! into each call. The launcher builds one from its configuration and the
//! runtime variables.

use pipeman_core::domain::Opaque;
use std::collections::BTreeMap;

use crate::variables::RuntimeVariables;

/// Image used when the launcher configuration does not name one
pub const DEFAULT_LAUNCHER_IMAGE: &str = "pipe-manager/launcher:latest";
/// Clone depth used when neither task nor pipeline sets one
pub const DEFAULT_CLONE_DEPTH: u32 = 1;

/// Inputs of the normalizer
#[derive(Debug, Clone, PartialEq)]
pub struct CompileContext {
    /// Image of the launcher, used by every synthesized step
    pub launcher_image: String,
    /// Fallback clone depth
    pub clone_depth: u32,
    /// Namespace the launcher deploys into
    pub namespace: String,
    pub bucket: BucketSettings,
    /// Log settings forwarded to continuation tasks
    pub log: LogSettings,
    pub variables: RuntimeVariables,
}

/// Object storage settings given to artifact and cache steps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketSettings {
    pub url: String,
    pub base_path: String,
    pub parameters: BTreeMap<String, String>,
    /// Extra env entries with storage credentials
    pub credential_env: Vec<Opaque>,
    /// Volumes backing [`Self::credential_mounts`]
    pub credential_volumes: Vec<Opaque>,
    pub credential_mounts: Vec<Opaque>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub format: String,
    pub file: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: "stdout".to_string(),
        }
    }
}

impl CompileContext {
    /// Creates a context with default launcher settings
    pub fn new(variables: RuntimeVariables) -> Self {
        Self {
            launcher_image: DEFAULT_LAUNCHER_IMAGE.to_string(),
            clone_depth: DEFAULT_CLONE_DEPTH,
            namespace: "default".to_string(),
            bucket: BucketSettings::default(),
            log: LogSettings::default(),
            variables,
        }
    }

    pub fn with_launcher_image(mut self, image: impl Into<String>) -> Self {
        self.launcher_image = image.into();
        self
    }

    pub fn with_bucket(mut self, bucket: BucketSettings) -> Self {
        self.bucket = bucket;
        self
    }
}

impl Default for CompileContext {
    fn default() -> Self {
        Self::new(RuntimeVariables::default())
    }
}
