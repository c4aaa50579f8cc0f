//! Repository checkout through the `git` executable
//!
//! Fetches a single commit into an empty directory:
//! - `git init`
//! - `git remote add origin <repository>`
//! - `git fetch [--depth N] origin <commit>`
//! - `git checkout FETCH_HEAD`

use anyhow::{Context, Result};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

/// Checks that git is installed and runnable
pub async fn check_git_available() -> Result<()> {
    let output = Command::new("git")
        .arg("--version")
        .output()
        .await
        .context("Failed to execute 'git --version'. Is git installed?")?;

    if !output.status.success() {
        anyhow::bail!("git is not working correctly");
    }

    debug!("{}", String::from_utf8_lossy(&output.stdout).trim());
    Ok(())
}

/// Checks out `commit` of `repository` into `destination`
///
/// # Arguments
/// * `repository` - Remote URL
/// * `commit` - Commit hash or ref to fetch
/// * `depth` - History depth; 0 fetches everything
/// * `destination` - Target directory, created when missing
///
/// # Errors
/// Returns an error if any git command fails
pub async fn clone_commit(
    repository: &str,
    commit: &str,
    depth: u32,
    destination: &Path,
) -> Result<()> {
    if repository.is_empty() {
        anyhow::bail!("repository cannot be empty");
    }
    if commit.is_empty() {
        anyhow::bail!("commit cannot be empty");
    }

    check_git_available().await?;

    tokio::fs::create_dir_all(destination)
        .await
        .with_context(|| format!("Failed to create {}", destination.display()))?;

    info!(
        "Cloning {} at {} into {} (depth {})",
        repository,
        commit,
        destination.display(),
        depth
    );

    run_git(destination, &["init", "--quiet"]).await?;
    run_git(destination, &["remote", "add", "origin", repository]).await?;

    let depth_arg = format!("--depth={}", depth);
    let mut fetch = vec!["fetch", "--quiet"];
    if depth > 0 {
        fetch.push(&depth_arg);
    }
    fetch.extend(["origin", commit]);
    run_git(destination, &fetch).await?;

    run_git(destination, &["checkout", "--quiet", "FETCH_HEAD"]).await?;

    info!("Repository checked out at {}", destination.display());
    Ok(())
}

async fn run_git(cwd: &Path, args: &[&str]) -> Result<()> {
    debug!("git {}", args.join(" "));

    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .await
        .with_context(|| format!("Failed to execute git {}", args[0]))?;

    if !output.status.success() {
        let exit_code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "git {} failed: exit_code={}, stderr='{}'",
            args.join(" "),
            exit_code,
            stderr.trim()
        );
    }

    Ok(())
}
