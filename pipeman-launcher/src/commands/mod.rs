//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod clone;
mod compile;
mod run;

pub use clone::CloneArgs;
pub use compile::CompileArgs;
pub use run::RunArgs;

use clap::Subcommand;

use crate::error::LauncherError;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Clone the repository, compile the selected pipelines and deploy them
    Run(RunArgs),
    /// Compile pipelines from a local directory and print the manifests
    Compile(CompileArgs),
    /// Fetch one commit of a repository
    Clone(CloneArgs),
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
///
/// # Returns
/// Result indicating success or the error that decides the exit code
pub async fn handle_command(command: Commands) -> Result<(), LauncherError> {
    match command {
        Commands::Run(args) => run::handle_run(args).await,
        Commands::Compile(args) => compile::handle_compile(args).await,
        Commands::Clone(args) => clone::handle_clone(args).await,
    }
}

/// Parse a single KEY=value pair
fn parse_key_val(s: &str) -> anyhow::Result<(String, String)> {
    let pos = s
        .find('=')
        .ok_or_else(|| anyhow::anyhow!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("GIT_BRANCH=feature=x").unwrap(),
            ("GIT_BRANCH".to_string(), "feature=x".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
    }
}
