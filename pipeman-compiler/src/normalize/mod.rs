//! Pipeline normalizer
//!
//! Turns a typed pipeline into the fully elaborated task graph that gets
//! deployed. For every task of `tasks`, `finishTasks.fail` and
//! `finishTasks.success`:
//! 1. clone, download and upload steps are injected when the effective clone
//!    policy asks for them
//! 2. default volumes are attached and mounted in every step
//! 3. the compiler-only `cloneRepository` and `paths` fields are cleared
//! 4. batch tasks are expanded into one task per batch entry
//!
//! Afterwards a `launch-<name>` finish task is synthesized for every entry
//! of `launch.whenFail` / `launch.whenSuccess`, and the pipeline-level
//! `cloneRepository` and `launch` fields are cleared.

pub mod batch;
pub mod launch;
pub mod steps;
pub mod volumes;

use pipeman_core::domain::Opaque;
use pipeman_core::domain::pipeline::{CloneRepositoryPolicy, Pipeline};
use pipeman_core::domain::task::{Paths, Step, Task};
use pipeman_core::names;
use pipeman_core::storage::StorageKind;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::context::CompileContext;
use crate::variables::{COMMIT, REPOSITORY};
use steps::Transfer;

/// Launcher binary inside the launcher image
pub const LAUNCHER_BINARY: &str = "/app/launcher";
/// Mount path of the shared workspace volume
pub const WORKSPACE_DIR: &str = "/workspaceDir";

const DEFAULT_SHELL: &str = "/bin/sh";
const DEFAULT_SHELL_SETS: &str = "set -e";

/// Prefix of synthesized continuation task names
pub const LAUNCH_TASK_PREFIX: &str = "launch";

/// Wraps a command into a fail-fast shell script
pub fn shell_script(command: &str) -> String {
    format!("#!{}\n{}\n{}", DEFAULT_SHELL, DEFAULT_SHELL_SETS, command)
}

/// Single-quotes `value` for the shell
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Per-pipeline state shared by all task rewrites
pub struct Normalizer<'a> {
    ctx: &'a CompileContext,
    policy: CloneRepositoryPolicy,
    clone_depth: u32,
    workspace: Option<Opaque>,
    ssh_secret_name: String,
    repository: String,
    commit: String,
}

impl<'a> Normalizer<'a> {
    /// Captures the pipeline-level inputs of normalization
    ///
    /// `repository` and `commit` are read from the pipeline's params.
    pub fn new(ctx: &'a CompileContext, pipeline: &Pipeline) -> Self {
        Self {
            ctx,
            policy: pipeline.clone_repository,
            clone_depth: pipeline.clone_depth,
            workspace: pipeline.workspace.clone(),
            ssh_secret_name: pipeline.ssh_secret_name.clone(),
            repository: pipeline.param(REPOSITORY).to_string(),
            commit: pipeline.param(COMMIT).to_string(),
        }
    }

    /// Depth for a task's clone step: task, then pipeline, then launcher default
    ///
    /// A zero launcher default is kept and means the full history.
    fn depth_for(&self, task: &Task) -> u32 {
        [task.clone_depth, self.clone_depth]
            .into_iter()
            .find(|depth| *depth > 0)
            .unwrap_or(self.ctx.clone_depth)
    }

    /// Rewrites one task: step injection, default volumes, field cleanup
    ///
    /// Batches are left in place; see [`Normalizer::normalize_set`].
    pub fn normalize_task(&self, name: &str, mut task: Task) -> Task {
        debug!("Normalizing task '{}'", name);

        let policy = self.policy.union(task.clone_repository);
        let paths = std::mem::take(&mut task.paths);
        task.clone_repository = CloneRepositoryPolicy::default();

        if policy.enable {
            self.inject_steps(name, &mut task, policy, &paths);
        }

        volumes::attach_defaults(&mut task, self.workspace.as_ref(), &self.ssh_secret_name);
        task
    }

    fn inject_steps(
        &self,
        name: &str,
        task: &mut Task,
        policy: CloneRepositoryPolicy,
        paths: &Paths,
    ) {
        let mut kinds = Vec::with_capacity(2);
        if policy.options.artifacts {
            kinds.push((StorageKind::Artifacts, paths.artifacts.as_slice()));
        }
        if policy.options.cache {
            kinds.push((StorageKind::Cache, paths.cache.as_slice()));
        }

        let mut first = vec![steps::clone_step(
            &self.ctx.launcher_image,
            self.depth_for(task),
            &self.repository,
            &self.commit,
        )];
        let mut last = Vec::with_capacity(kinds.len());

        for (kind, kind_paths) in &kinds {
            if kind_paths.is_empty() {
                warn!("Task '{}' enables {} but declares no {} paths", name, kind, kind);
            }
            first.push(self.transfer(Transfer::Download, *kind, kind_paths));
            last.push(self.transfer(Transfer::Upload, *kind, kind_paths));
        }

        if !kinds.is_empty() {
            for volume in &self.ctx.bucket.credential_volumes {
                volumes::push_unique(&mut task.volumes, volume.clone());
            }
        }

        debug!(
            "Task '{}': injecting {} leading and {} trailing step(s)",
            name,
            first.len(),
            last.len()
        );

        first.append(&mut task.steps);
        first.append(&mut last);
        task.steps = first;
    }

    fn transfer(&self, transfer: Transfer, kind: StorageKind, paths: &[String]) -> Step {
        steps::transfer_step(
            self.ctx,
            transfer,
            kind,
            paths,
            &self.repository,
            &self.commit,
        )
    }

    /// Normalizes every task of a set and expands batches
    ///
    /// A batch unit whose name collides with another task replaces it.
    pub fn normalize_set(&self, tasks: BTreeMap<String, Task>) -> BTreeMap<String, Task> {
        let mut normalized = BTreeMap::new();

        for (name, task) in tasks {
            let task = self.normalize_task(&name, task);
            for (unit_name, unit) in batch::expand(&name, task) {
                if normalized.insert(unit_name.clone(), unit).is_some() {
                    warn!("Task '{}' defined more than once, keeping the last one", unit_name);
                }
            }
        }

        normalized
    }

    /// Finish task that starts `target` once this pipeline ends
    ///
    /// The task always clones the repository so the child launcher can read
    /// the pipeline fragments, whatever the clone policy says.
    pub fn continuation(&self, target: &str) -> (String, Task) {
        let mut task = launch::continuation_task(self.ctx, target);
        let clone = steps::clone_step(
            &self.ctx.launcher_image,
            self.depth_for(&task),
            &self.repository,
            &self.commit,
        );
        task.steps.insert(0, clone);
        volumes::attach_defaults(&mut task, self.workspace.as_ref(), &self.ssh_secret_name);

        (names::combine(LAUNCH_TASK_PREFIX, target), task)
    }
}

/// Normalizes one pipeline
///
/// # Arguments
/// * `pipeline` - Typed pipeline as produced by [`crate::convert::to_pipeline`]
/// * `ctx` - Launcher settings and runtime variables
///
/// # Returns
/// The elaborated pipeline, ready to be wrapped into a deployable object
pub fn normalize(mut pipeline: Pipeline, ctx: &CompileContext) -> Pipeline {
    let normalizer = Normalizer::new(ctx, &pipeline);

    pipeline.tasks = normalizer.normalize_set(std::mem::take(&mut pipeline.tasks));
    pipeline.finish_tasks.fail =
        normalizer.normalize_set(std::mem::take(&mut pipeline.finish_tasks.fail));
    pipeline.finish_tasks.success =
        normalizer.normalize_set(std::mem::take(&mut pipeline.finish_tasks.success));

    let launch = std::mem::take(&mut pipeline.launch);
    for target in &launch.when_fail {
        let (name, task) = normalizer.continuation(target);
        pipeline.finish_tasks.fail.insert(name, task);
    }
    for target in &launch.when_success {
        let (name, task) = normalizer.continuation(target);
        pipeline.finish_tasks.success.insert(name, task);
    }

    pipeline.clone_repository = CloneRepositoryPolicy::default();

    info!(
        "Normalized pipeline '{}': {} task(s), {} fail task(s), {} success task(s)",
        pipeline.name,
        pipeline.tasks.len(),
        pipeline.finish_tasks.fail.len(),
        pipeline.finish_tasks.success.len()
    );

    pipeline
}
