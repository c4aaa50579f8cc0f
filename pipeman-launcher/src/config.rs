//! Launcher configuration
//!
//! Settings come from a YAML file (`--config`) or, when no file is given,
//! from `COMMON_DATA_*` / `LAUNCHER_DATA_*` environment variables. The
//! loaded configuration is turned into a [`CompileContext`] for the
//! compiler.

use anyhow::{Context, Result};
use pipeman_compiler::{BucketSettings, CompileContext, LogSettings, RuntimeVariables};
use pipeman_core::domain::Opaque;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const LOG_LEVELS: &[&str] = &["debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["text", "json"];

/// Root of the launcher configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub common: CommonConfig,
    pub launcher: LauncherSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonConfig {
    pub log: LogConfig,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// One of `debug`, `info`, `warn`, `error`
    pub level: String,
    /// `text` or `json`
    pub format: String,
    /// `stdout`, `stderr`, or a file path opened in append mode
    pub file: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        let defaults = LogSettings::default();
        Self {
            level: defaults.level,
            format: defaults.format,
            file: defaults.file,
        }
    }
}

/// Launcher image, target namespace and storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LauncherSettings {
    pub image_name: String,
    /// Image tag; empty means the launcher's own version
    pub tag: String,
    pub namespace: String,
    /// Default clone depth; 0 fetches the full history
    pub clone_depth: u32,
    pub artifacts_bucket: BucketConfig,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            image_name: "pipe-manager/launcher".to_string(),
            tag: String::new(),
            namespace: "pipe-manager".to_string(),
            clone_depth: 1,
            artifacts_bucket: BucketConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BucketConfig {
    pub url: String,
    pub base_path: String,
    pub parameters: BTreeMap<String, String>,
    pub credentials: Credentials,
}

/// Opaque pod fragments giving bucket steps access to storage credentials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Credentials {
    pub env: Vec<Opaque>,
    pub volumes: Vec<Opaque>,
    pub volume_mounts: Vec<Opaque>,
}

impl LauncherConfig {
    /// Loads the configuration file at `path`, or the environment when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses a YAML configuration file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid
    /// configuration document
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_yaml::from_str(&source)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Creates configuration from environment variables
    ///
    /// Recognized variables (all optional):
    /// - COMMON_DATA_LOG_LEVEL, COMMON_DATA_LOG_FORMAT, COMMON_DATA_LOG_FILE
    /// - LAUNCHER_DATA_IMAGENAME, LAUNCHER_DATA_TAG, LAUNCHER_DATA_NAMESPACE
    /// - LAUNCHER_DATA_CLONEDEPTH
    /// - LAUNCHER_DATA_ARTIFACTSBUCKET_URL, LAUNCHER_DATA_ARTIFACTSBUCKET_BASEPATH
    /// - LAUNCHER_DATA_ARTIFACTSBUCKET_PARAMETERS (YAML or JSON map)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LauncherConfig::from_env`] with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let set = |target: &mut String, key: &str| {
            if let Some(value) = lookup(key) {
                *target = value;
            }
        };

        set(&mut config.common.log.level, "COMMON_DATA_LOG_LEVEL");
        set(&mut config.common.log.format, "COMMON_DATA_LOG_FORMAT");
        set(&mut config.common.log.file, "COMMON_DATA_LOG_FILE");

        let launcher = &mut config.launcher;
        set(&mut launcher.image_name, "LAUNCHER_DATA_IMAGENAME");
        set(&mut launcher.tag, "LAUNCHER_DATA_TAG");
        set(&mut launcher.namespace, "LAUNCHER_DATA_NAMESPACE");
        set(&mut launcher.artifacts_bucket.url, "LAUNCHER_DATA_ARTIFACTSBUCKET_URL");
        set(
            &mut launcher.artifacts_bucket.base_path,
            "LAUNCHER_DATA_ARTIFACTSBUCKET_BASEPATH",
        );

        if let Some(depth) = lookup("LAUNCHER_DATA_CLONEDEPTH") {
            launcher.clone_depth = depth
                .trim()
                .parse()
                .with_context(|| format!("Invalid LAUNCHER_DATA_CLONEDEPTH '{}'", depth))?;
        }

        if let Some(parameters) = lookup("LAUNCHER_DATA_ARTIFACTSBUCKET_PARAMETERS") {
            let parameters: Option<BTreeMap<String, String>> = serde_yaml::from_str(&parameters)
                .context("Invalid LAUNCHER_DATA_ARTIFACTSBUCKET_PARAMETERS")?;
            launcher.artifacts_bucket.parameters = parameters.unwrap_or_default();
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        let log = &self.common.log;
        if !LOG_LEVELS.contains(&log.level.as_str()) {
            anyhow::bail!(
                "log level '{}' must be one of {}",
                log.level,
                LOG_LEVELS.join(", ")
            );
        }

        if !LOG_FORMATS.contains(&log.format.as_str()) {
            anyhow::bail!("log format '{}' must be text or json", log.format);
        }

        if log.file.is_empty() {
            anyhow::bail!("log file cannot be empty");
        }

        if self.launcher.image_name.is_empty() {
            anyhow::bail!("launcher image name cannot be empty");
        }

        if self.launcher.namespace.is_empty() {
            anyhow::bail!("launcher namespace cannot be empty");
        }

        Ok(())
    }

    /// Launcher image reference, `name:tag`
    pub fn image(&self) -> String {
        let tag = if self.launcher.tag.is_empty() {
            env!("CARGO_PKG_VERSION")
        } else {
            self.launcher.tag.as_str()
        };
        format!("{}:{}", self.launcher.image_name, tag)
    }

    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            level: self.common.log.level.clone(),
            format: self.common.log.format.clone(),
            file: self.common.log.file.clone(),
        }
    }

    /// Builds the compiler context for this invocation
    pub fn compile_context(&self, variables: RuntimeVariables) -> CompileContext {
        let bucket = &self.launcher.artifacts_bucket;

        CompileContext {
            launcher_image: self.image(),
            clone_depth: self.launcher.clone_depth,
            namespace: self.launcher.namespace.clone(),
            bucket: BucketSettings {
                url: bucket.url.clone(),
                base_path: bucket.base_path.clone(),
                parameters: bucket.parameters.clone(),
                credential_env: bucket.credentials.env.clone(),
                credential_volumes: bucket.credentials.volumes.clone(),
                credential_mounts: bucket.credentials.volume_mounts.clone(),
            },
            log: self.log_settings(),
            variables,
        }
    }
}
