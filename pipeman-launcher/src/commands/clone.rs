//! `clone` command, used by the synthesized `clone-repository` steps

use clap::Args;
use std::path::PathBuf;

use crate::config::LauncherConfig;
use crate::error::LauncherError;
use crate::{git, logging};

#[derive(Args)]
pub struct CloneArgs {
    /// Remote repository URL
    #[arg(long)]
    pub repository: String,

    /// Commit to check out
    #[arg(long)]
    pub commit: String,

    /// History depth, 0 for the full history; defaults to the configured depth
    #[arg(long)]
    pub depth: Option<u32>,

    /// Target directory
    #[arg(long)]
    pub destination: PathBuf,
}

impl CloneArgs {
    /// Depth from `--depth`, else `LAUNCHER_DATA_CLONEDEPTH` from the config
    pub fn depth_or_configured(&self, config: &LauncherConfig) -> u32 {
        self.depth.unwrap_or(config.launcher.clone_depth)
    }
}

pub async fn handle_clone(args: CloneArgs) -> Result<(), LauncherError> {
    let config = LauncherConfig::load(None).map_err(LauncherError::Config)?;
    logging::init(&config.log_settings()).map_err(LauncherError::Config)?;

    let depth = args.depth_or_configured(&config);
    git::clone_commit(&args.repository, &args.commit, depth, &args.destination)
        .await
        .map_err(LauncherError::Clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: CloneArgs,
    }

    fn parse(extra: &[&str]) -> CloneArgs {
        let mut argv = vec![
            "pipeman",
            "--repository",
            "git@example.com:app.git",
            "--commit",
            "abc",
            "--destination",
            "/workspaceDir",
        ];
        argv.extend_from_slice(extra);
        TestCli::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn test_depth_defaults_to_configured() {
        let mut config = LauncherConfig::default();
        config.launcher.clone_depth = 0;

        let args = parse(&[]);
        assert_eq!(args.depth, None);
        assert_eq!(args.depth_or_configured(&config), 0);

        config.launcher.clone_depth = 5;
        assert_eq!(args.depth_or_configured(&config), 5);
    }

    #[test]
    fn test_explicit_depth_wins() {
        let config = LauncherConfig::default();
        let args = parse(&["--depth", "3"]);
        assert_eq!(args.depth_or_configured(&config), 3);
    }
}
