//! `compile` command
//!
//! Dry run over a local fragment directory. Manifests go to stdout (or
//! `--output`), logs and the summary to stderr.

use clap::Args;
use colored::*;
use pipeman_compiler::{RuntimeVariables, compile_tree};
use std::path::PathBuf;

use super::parse_key_val;
use crate::config::LauncherConfig;
use crate::deploy::{ManifestDeployer, deploy_all};
use crate::error::LauncherError;
use crate::logging;

#[derive(Args)]
pub struct CompileArgs {
    /// Directory holding the pipeline fragments
    #[arg(short, long)]
    pub pipelines_dir: PathBuf,

    /// Runtime variables as KEY=value pairs, without the PIPELINE_ prefix
    #[arg(short, long = "var", value_parser = parse_key_val)]
    pub vars: Vec<(String, String)>,

    /// Configuration file; environment variables are used when omitted
    #[arg(short, long, env = "PIPEMAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write one manifest per object here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn handle_compile(args: CompileArgs) -> Result<(), LauncherError> {
    let config = LauncherConfig::load(args.config.as_deref()).map_err(LauncherError::Config)?;

    let mut log = config.log_settings();
    if log.file == "stdout" {
        log.file = "stderr".to_string();
    }
    logging::init(&log).map_err(LauncherError::Config)?;

    let mut variables = RuntimeVariables::from_env();
    for (key, value) in args.vars {
        variables.insert(key, value);
    }

    let namespace = config.launcher.namespace.clone();
    let ctx = config.compile_context(variables);
    let output = compile_tree(&args.pipelines_dir, &ctx)?;

    for diagnostic in &output.diagnostics {
        eprintln!("{} {}", "warning:".yellow().bold(), diagnostic);
    }

    let names: Vec<String> = output.pipelines.iter().map(|p| p.name.clone()).collect();
    let deployer = ManifestDeployer::new(args.output);
    deploy_all(&deployer, output.pipelines, &namespace, "dry-run")
        .await
        .map_err(LauncherError::Deploy)?;

    if names.is_empty() {
        eprintln!("{}", "No pipeline selected".yellow());
    } else {
        eprintln!(
            "{} {}",
            format!("✓ Compiled {} pipeline(s):", names.len()).green().bold(),
            names.join(", ").cyan()
        );
    }

    Ok(())
}
