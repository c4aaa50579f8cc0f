//! Launcher errors and process exit codes

use pipeman_compiler::CompileError;
use thiserror::Error;

/// Errors that end a launcher invocation
///
/// Each kind maps to its own process exit code so callers can tell a bad
/// configuration from a failed clone or a rejected deployment.
#[derive(Debug, Error)]
pub enum LauncherError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0:#}")]
    Config(anyhow::Error),

    /// The repository could not be fetched
    #[error("Failed to clone repository: {0:#}")]
    Clone(anyhow::Error),

    /// The fragment tree could not be merged
    #[error("Failed to merge pipeline fragments: {0}")]
    Merge(#[source] CompileError),

    /// A selected pipeline could not be compiled
    #[error("Failed to compile pipelines: {0}")]
    Compile(#[source] CompileError),

    /// A compiled pipeline could not be handed to the deployer
    #[error("Failed to deploy pipeline: {0:#}")]
    Deploy(anyhow::Error),
}

impl LauncherError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            LauncherError::Config(_) => 1,
            LauncherError::Clone(_) => 2,
            LauncherError::Merge(_) => 3,
            LauncherError::Compile(_) => 4,
            LauncherError::Deploy(_) => 5,
        }
    }
}

impl From<CompileError> for LauncherError {
    fn from(err: CompileError) -> Self {
        if err.is_merge_error() {
            LauncherError::Merge(err)
        } else {
            LauncherError::Compile(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            LauncherError::Config(anyhow::anyhow!("bad")).exit_code(),
            LauncherError::Clone(anyhow::anyhow!("bad")).exit_code(),
            LauncherError::Merge(CompileError::InvalidFragment {
                path: PathBuf::from("a.yaml"),
            })
            .exit_code(),
            LauncherError::Deploy(anyhow::anyhow!("bad")).exit_code(),
        ];
        assert_eq!(codes, [1, 2, 3, 5]);
    }

    #[test]
    fn test_compile_error_classification() {
        let merge: LauncherError = CompileError::InvalidFragment {
            path: PathBuf::from("a.yaml"),
        }
        .into();
        assert_eq!(merge.exit_code(), 3);

        let source = serde_yaml::from_str::<u32>("x").unwrap_err();
        let compile: LauncherError = CompileError::Convert {
            pipeline: "build".to_string(),
            source,
        }
        .into();
        assert_eq!(compile.exit_code(), 4);
    }

    #[test]
    fn test_context_chain_is_displayed() {
        use anyhow::Context;

        let err = std::fs::read("/definitely/missing")
            .context("Failed to read config")
            .unwrap_err();
        let message = LauncherError::Config(err).to_string();
        assert!(message.starts_with("Configuration error: Failed to read config: "));
    }
}
