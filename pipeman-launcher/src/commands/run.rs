//! `run` command
//!
//! The launcher entry point inside the cluster: read the runtime variables,
//! check out the repository, compile the selected pipelines and deploy them.

use anyhow::anyhow;
use clap::Args;
use pipeman_compiler::{RuntimeVariables, compile_tree};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::LauncherConfig;
use crate::deploy::{ManifestDeployer, deploy_all};
use crate::error::LauncherError;
use crate::{git, logging};

/// Directory holding the fragments inside a checked-out repository
pub const PIPELINES_DIR: &str = ".pipelines";

#[derive(Args)]
pub struct RunArgs {
    /// Configuration file; environment variables are used when omitted
    #[arg(short, long, env = "PIPEMAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use an existing fragment directory instead of cloning the repository
    #[arg(long)]
    pub pipelines_dir: Option<PathBuf>,

    /// Directory the repository is checked out into
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Write one manifest per object here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn handle_run(args: RunArgs) -> Result<(), LauncherError> {
    let config = LauncherConfig::load(args.config.as_deref()).map_err(LauncherError::Config)?;
    logging::init(&config.log_settings()).map_err(LauncherError::Config)?;

    let launch_id = Uuid::new_v4().to_string();
    let variables = RuntimeVariables::from_env();
    info!(
        "Starting launch {} with {} runtime variable(s)",
        launch_id,
        variables.len()
    );

    let pipelines_dir = match args.pipelines_dir {
        Some(dir) => dir,
        None => {
            let workdir = args
                .workdir
                .unwrap_or_else(|| std::env::temp_dir().join(format!("pipeman-{}", launch_id)));
            checkout(&config, &variables, &workdir).await?;
            workdir.join(PIPELINES_DIR)
        }
    };

    let namespace = config.launcher.namespace.clone();
    let ctx = config.compile_context(variables);
    let output = compile_tree(&pipelines_dir, &ctx)?;

    if output.pipelines.is_empty() {
        warn!("No pipeline selected, nothing to launch");
        return Ok(());
    }

    let deployer = ManifestDeployer::new(args.output);
    let deployed = deploy_all(&deployer, output.pipelines, &namespace, &launch_id)
        .await
        .map_err(LauncherError::Deploy)?;

    info!("Launch {} finished: {} pipeline(s) deployed", launch_id, deployed);
    Ok(())
}

async fn checkout(
    config: &LauncherConfig,
    variables: &RuntimeVariables,
    workdir: &std::path::Path,
) -> Result<(), LauncherError> {
    let repository = variables.repository();
    let commit = variables.commit();
    if repository.is_empty() || commit.is_empty() {
        return Err(LauncherError::Clone(anyhow!(
            "PIPELINE_REPOSITORY and PIPELINE_COMMIT must be set unless --pipelines-dir is given"
        )));
    }

    git::clone_commit(repository, commit, config.launcher.clone_depth, workdir)
        .await
        .map_err(LauncherError::Clone)
}
