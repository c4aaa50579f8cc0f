//! Synthesized steps: repository clone and bucket transfers

use pipeman_core::domain::task::Step;
use pipeman_core::storage::{self, StorageKind};
use serde_json::json;

use super::{LAUNCHER_BINARY, WORKSPACE_DIR, shell_quote, shell_script};
use crate::context::CompileContext;

pub const CLONE_STEP: &str = "clone-repository";

/// Direction of a bucket transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Download,
    Upload,
}

impl Transfer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transfer::Download => "download",
            Transfer::Upload => "upload",
        }
    }
}

/// Step that clones `repository` at `commit` into the workspace
pub fn clone_step(image: &str, depth: u32, repository: &str, commit: &str) -> Step {
    let command = format!(
        "{} clone --depth {} --repository {} --commit {} --destination {}",
        LAUNCHER_BINARY,
        depth,
        shell_quote(repository),
        shell_quote(commit),
        shell_quote(WORKSPACE_DIR),
    );

    Step {
        name: CLONE_STEP.to_string(),
        description: "Automatically clone the repository".to_string(),
        image: image.to_string(),
        script: shell_script(&command),
        ..Default::default()
    }
}

/// Step name for a transfer, e.g. `download-artifacts`
pub fn transfer_step_name(transfer: Transfer, kind: StorageKind) -> String {
    format!("{}-{}", transfer.as_str(), kind.as_str())
}

/// Step that moves `paths` between the workspace and the bucket
///
/// Artifacts are keyed by project and commit; the cache only by project.
pub fn transfer_step(
    ctx: &CompileContext,
    transfer: Transfer,
    kind: StorageKind,
    paths: &[String],
    repository: &str,
    commit: &str,
) -> Step {
    let mut parts = vec![
        LAUNCHER_BINARY.to_string(),
        kind.as_str().to_string(),
        transfer.as_str().to_string(),
    ];
    if kind == StorageKind::Artifacts {
        parts.push(format!("--commit {}", shell_quote(commit)));
    }
    parts.push(format!("--destination {}", shell_quote(WORKSPACE_DIR)));
    parts.push(format!("--project {}", shell_quote(repository)));
    parts.extend(paths.iter().map(|path| format!("--path {}", shell_quote(path))));

    let bucket = &ctx.bucket;
    let parameters = serde_json::to_string(&bucket.parameters).unwrap_or_else(|_| "{}".into());
    let prefix = storage::object_prefix(&bucket.base_path, kind, repository, commit);

    let mut env = vec![
        json!({ "name": "LAUNCHER_DATA_BUCKET_URL", "value": bucket.url }),
        json!({ "name": "LAUNCHER_DATA_BUCKET_BASEPATH", "value": bucket.base_path }),
        json!({ "name": "LAUNCHER_DATA_BUCKET_PARAMETERS", "value": parameters }),
        json!({ "name": "LAUNCHER_DATA_BUCKET_PREFIX", "value": prefix }),
    ];
    env.extend(bucket.credential_env.iter().cloned());

    Step {
        name: transfer_step_name(transfer, kind),
        description: format!("Automatically {} the {}", transfer.as_str(), kind.as_str()),
        image: ctx.launcher_image.clone(),
        env,
        volume_mounts: bucket.credential_mounts.clone(),
        script: shell_script(&parts.join(" ")),
        ..Default::default()
    }
}
