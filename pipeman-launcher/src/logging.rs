//! Logging setup
//!
//! `RUST_LOG` takes precedence over the configured level. Output goes to
//! stdout, stderr, or a file opened in append mode, as text or JSON.

use anyhow::{Context, Result};
use pipeman_compiler::LogSettings;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes the global subscriber from `settings`
///
/// # Errors
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed
pub fn init(settings: &LogSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str()));
    let writer = make_writer(&settings.file)?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = if settings.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_ansi(settings.file == "stdout").with_writer(writer))
            .try_init()
    };

    result.context("Failed to initialize logging")
}

fn make_writer(file: &str) -> Result<BoxMakeWriter> {
    match file {
        "stdout" => Ok(BoxMakeWriter::new(std::io::stdout)),
        "stderr" => Ok(BoxMakeWriter::new(std::io::stderr)),
        path => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path))?;
            Ok(BoxMakeWriter::new(Arc::new(file)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_is_created() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("launcher.log");

        assert!(make_writer(path.to_str().unwrap()).is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_unwritable_log_file() {
        assert!(make_writer("/nonexistent/dir/launcher.log").is_err());
    }
}
