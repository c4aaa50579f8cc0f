//! Continuation tasks
//!
//! `launch.whenSuccess` / `launch.whenFail` name pipelines to start after
//! this one finishes. Each becomes a finish task that clones the repository
//! and runs the launcher again with the target pipeline selected by name.

use pipeman_core::domain::Opaque;
use pipeman_core::domain::task::{Step, Task};
use serde_json::json;

use super::{LAUNCHER_BINARY, shell_script};
use crate::context::CompileContext;
use crate::variables::{NAME, VARIABLE_PREFIX};

pub const LAUNCH_STEP: &str = "launch-pipeline";

fn env_var(name: impl Into<String>, value: impl Into<String>) -> Opaque {
    json!({ "name": name.into(), "value": value.into() })
}

/// Environment handed to the launcher that starts `target`
///
/// Every runtime variable is forwarded except `NAME`, which is forced to
/// the target so the child run selects by name.
pub fn launcher_env(ctx: &CompileContext, target: &str) -> Vec<Opaque> {
    let mut env: Vec<Opaque> = ctx
        .variables
        .iter()
        .filter(|(key, _)| *key != NAME)
        .map(|(key, value)| env_var(format!("{}{}", VARIABLE_PREFIX, key), value))
        .collect();

    env.push(env_var(format!("{}{}", VARIABLE_PREFIX, NAME), target));
    env.push(env_var("COMMON_DATA_LOG_LEVEL", ctx.log.level.as_str()));
    env.push(env_var("COMMON_DATA_LOG_FORMAT", ctx.log.format.as_str()));
    env.push(env_var("COMMON_DATA_LOG_FILE", ctx.log.file.as_str()));
    env.push(env_var("LAUNCHER_DATA_CLONEDEPTH", ctx.clone_depth.to_string()));
    env.push(env_var("LAUNCHER_DATA_NAMESPACE", ctx.namespace.as_str()));
    env
}

/// Builds the finish task that launches `target`
///
/// The clone step is prepended by the caller together with the default
/// volumes, the same way it is for user tasks.
pub fn continuation_task(ctx: &CompileContext, target: &str) -> Task {
    let description = format!("Launch the next pipeline '{}' in the chain", target);
    let step = Step {
        name: LAUNCH_STEP.to_string(),
        description: description.clone(),
        image: ctx.launcher_image.clone(),
        env: launcher_env(ctx, target),
        script: shell_script(&format!("{} run", LAUNCHER_BINARY)),
        ..Default::default()
    };

    Task {
        description,
        steps: vec![step],
        ..Default::default()
    }
}
