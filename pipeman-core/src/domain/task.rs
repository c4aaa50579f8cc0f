//! Task and step domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::pipeline::CloneRepositoryPolicy;
use super::{Opaque, is_zero};

/// Parameter overrides for one batch entry
pub type Batch = BTreeMap<String, String>;

/// Task definition
///
/// `clone_repository` and `paths` only steer step injection during
/// normalization and are reset afterwards. `run_after` is carried through
/// untouched for the downstream scheduler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub run_after: Vec<String>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "crate::scalar::batch_map"
    )]
    pub batch: BTreeMap<String, Batch>,
    #[serde(default, deserialize_with = "crate::scalar::string_map")]
    pub params: BTreeMap<String, String>,
    #[serde(
        default,
        rename = "cloneRepository",
        skip_serializing_if = "CloneRepositoryPolicy::is_empty"
    )]
    pub clone_repository: CloneRepositoryPolicy,
    #[serde(default, skip_serializing_if = "Paths::is_empty")]
    pub paths: Paths,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub clone_depth: u32,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sidecars: Vec<Opaque>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Opaque>,
}

/// Paths packaged by the artifact and cache steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paths {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cache: Vec<String>,
}

impl Paths {
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty() && self.cache.is_empty()
    }
}

/// A single container step inside a task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<Opaque>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<Opaque>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub script: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_task() {
        let yaml = r#"
description: Matrix tests
batch:
  linux:
    OS: linux
    ARCH: 64
  windows: ~
params:
  PROFILE: release
paths:
  artifacts: [target/release]
steps:
  - name: test
    image: rust:1.85
    env:
      - name: CARGO_TERM_COLOR
        value: always
    command: [cargo]
    args: [test]
"#;

        let task: Task = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(task.batch.len(), 2);
        assert_eq!(task.batch["linux"]["OS"], "linux");
        assert_eq!(task.batch["linux"]["ARCH"], "64");
        assert!(task.batch["windows"].is_empty());
        assert_eq!(task.params["PROFILE"], "release");
        assert_eq!(task.paths.artifacts, vec!["target/release"]);
        assert_eq!(task.steps[0].env[0]["name"], "CARGO_TERM_COLOR");
        assert_eq!(task.steps[0].args, vec!["test"]);
    }

    #[test]
    fn test_task_without_params_has_empty_map() {
        let task: Task = serde_yaml::from_str("steps: []").unwrap();
        assert!(task.params.is_empty());

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["params"], serde_json::json!({}));
        assert!(json.get("paths").is_none());
        assert!(json.get("cloneRepository").is_none());
    }

    #[test]
    fn test_step_rejects_wrong_shape() {
        let result: Result<Step, _> = serde_yaml::from_str("name: [not, a, string]");
        assert!(result.is_err());
    }
}
