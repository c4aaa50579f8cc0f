//! Default volumes and mounts
//!
//! Every task gets a `workspace` volume and, when the pipeline names an SSH
//! secret, an `ssh-credentials` secret volume. Every step of the task mounts
//! what was attached. Attachment is keyed by name, so applying it twice
//! changes nothing.

use pipeman_core::domain::Opaque;
use pipeman_core::domain::task::{Step, Task};
use serde_json::json;

use super::WORKSPACE_DIR;

pub const WORKSPACE_VOLUME: &str = "workspace";
pub const SSH_VOLUME: &str = "ssh-credentials";
pub const SSH_MOUNT_PATH: &str = "/root/.ssh";

/// Owner read-only (0400)
const SSH_DEFAULT_MODE: u32 = 256;

/// Volume name of an opaque volume or mount entry
pub fn entry_name(entry: &Opaque) -> Option<&str> {
    entry.get("name").and_then(Opaque::as_str)
}

/// Adds `entry` unless an entry with the same name is already present
pub fn push_unique(entries: &mut Vec<Opaque>, entry: Opaque) {
    let exists = entry_name(&entry)
        .is_some_and(|name| entries.iter().any(|e| entry_name(e) == Some(name)));
    if !exists {
        entries.push(entry);
    }
}

/// Workspace volume: the pipeline's `workspaceDir` if set, else an emptyDir
///
/// A caller-supplied spec without a name is given the workspace name.
fn workspace_volume(workspace: Option<&Opaque>) -> Opaque {
    match workspace {
        Some(Opaque::Object(spec)) => {
            let mut spec = spec.clone();
            spec.entry("name").or_insert_with(|| Opaque::from(WORKSPACE_VOLUME));
            Opaque::Object(spec)
        }
        Some(other) => other.clone(),
        None => json!({ "name": WORKSPACE_VOLUME, "emptyDir": {} }),
    }
}

fn ssh_volume(secret_name: &str) -> Opaque {
    json!({
        "name": SSH_VOLUME,
        "secret": {
            "secretName": secret_name,
            "defaultMode": SSH_DEFAULT_MODE,
        },
    })
}

/// Attaches the default volumes to `task` and mounts them in every step
///
/// An empty `ssh_secret_name` means no SSH volume and no SSH mount.
pub fn attach_defaults(task: &mut Task, workspace: Option<&Opaque>, ssh_secret_name: &str) {
    let workspace = workspace_volume(workspace);
    let workspace_name = entry_name(&workspace)
        .unwrap_or(WORKSPACE_VOLUME)
        .to_string();
    let with_ssh = !ssh_secret_name.is_empty();

    push_unique(&mut task.volumes, workspace);
    if with_ssh {
        push_unique(&mut task.volumes, ssh_volume(ssh_secret_name));
    }

    for step in &mut task.steps {
        mount_defaults(step, &workspace_name, with_ssh);
    }
}

fn mount_defaults(step: &mut Step, workspace_name: &str, with_ssh: bool) {
    push_unique(
        &mut step.volume_mounts,
        json!({ "name": workspace_name, "mountPath": WORKSPACE_DIR }),
    );
    if with_ssh {
        push_unique(
            &mut step.volume_mounts,
            json!({ "name": SSH_VOLUME, "mountPath": SSH_MOUNT_PATH, "readOnly": true }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_with_steps(n: usize) -> Task {
        Task {
            steps: (0..n)
                .map(|i| Step {
                    name: format!("s{}", i),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_workspace_is_empty_dir() {
        let mut task = task_with_steps(2);
        attach_defaults(&mut task, None, "git-ssh");

        assert_eq!(task.volumes.len(), 2);
        assert_eq!(task.volumes[0], json!({"name": "workspace", "emptyDir": {}}));
        assert_eq!(task.volumes[1]["secret"]["secretName"], "git-ssh");
        assert_eq!(task.volumes[1]["secret"]["defaultMode"], 256);

        for step in &task.steps {
            assert_eq!(step.volume_mounts.len(), 2);
            assert_eq!(step.volume_mounts[0]["mountPath"], WORKSPACE_DIR);
            assert_eq!(step.volume_mounts[1]["readOnly"], true);
        }
    }

    #[test]
    fn test_ssh_volume_requires_secret_name() {
        let mut task = task_with_steps(1);
        attach_defaults(&mut task, None, "");

        assert_eq!(task.volumes.len(), 1);
        assert_eq!(task.steps[0].volume_mounts.len(), 1);
        assert_eq!(entry_name(&task.steps[0].volume_mounts[0]), Some(WORKSPACE_VOLUME));
    }

    #[test]
    fn test_custom_workspace_spec() {
        let mut task = task_with_steps(1);
        let spec = json!({"persistentVolumeClaim": {"claimName": "cache"}});
        attach_defaults(&mut task, Some(&spec), "git-ssh");

        assert_eq!(task.volumes[0]["name"], "workspace");
        assert_eq!(task.volumes[0]["persistentVolumeClaim"]["claimName"], "cache");
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut task = task_with_steps(1);
        attach_defaults(&mut task, None, "git-ssh");
        let once = task.clone();
        attach_defaults(&mut task, None, "git-ssh");
        assert_eq!(task, once);
    }

    #[test]
    fn test_user_volume_with_same_name_wins() {
        let mut task = task_with_steps(0);
        task.volumes.push(json!({"name": "workspace", "hostPath": {"path": "/data"}}));
        attach_defaults(&mut task, None, "git-ssh");

        assert_eq!(task.volumes.len(), 2);
        assert_eq!(task.volumes[0]["hostPath"]["path"], "/data");
    }
}
