//! Pipeline domain types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::task::Task;
use super::{Opaque, is_zero};

/// Pipeline definition
///
/// Built from one selected document node (global defaults merged underneath).
/// `clone_repository` and `launch` are compiler inputs only: normalization
/// consumes them and resets them to their defaults, so they are absent from
/// the serialized form handed to the deployer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Namespace::is_empty")]
    pub namespace: Namespace,
    #[serde(
        default,
        rename = "cloneRepository",
        skip_serializing_if = "CloneRepositoryPolicy::is_empty"
    )]
    pub clone_repository: CloneRepositoryPolicy,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub clone_depth: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ssh_secret_name: String,
    #[serde(default, skip_serializing_if = "Launch::is_empty")]
    pub launch: Launch,
    #[serde(default, deserialize_with = "crate::scalar::string_map")]
    pub params: BTreeMap<String, String>,
    /// Workspace volume spec; an ephemeral volume is used when absent
    #[serde(default, rename = "workspaceDir", skip_serializing_if = "Option::is_none")]
    pub workspace: Option<Opaque>,
    #[serde(default)]
    pub tasks: BTreeMap<String, Task>,
    #[serde(default, skip_serializing_if = "FinishTasks::is_empty")]
    pub finish_tasks: FinishTasks,
}

impl Pipeline {
    /// Returns a parameter value, or an empty string when it is not set
    pub fn param(&self, key: &str) -> &str {
        self.params.get(key).map(String::as_str).unwrap_or_default()
    }
}

/// Target namespace for the deployed pipeline object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub create: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub name: String,
}

impl Namespace {
    pub fn is_empty(&self) -> bool {
        !self.create && self.labels.is_empty() && self.name.is_empty()
    }
}

/// Flags controlling automatic checkout and artifact/cache steps
///
/// Declared at pipeline level and optionally at task level. The effective
/// policy for a task is the union of both: a task can add behaviour but
/// never switch off a pipeline-wide flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneRepositoryPolicy {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub options: CloneRepositoryOptions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneRepositoryOptions {
    #[serde(default)]
    pub artifacts: bool,
    #[serde(default)]
    pub cache: bool,
}

impl CloneRepositoryPolicy {
    /// Union of two policy levels
    pub fn union(self, other: CloneRepositoryPolicy) -> CloneRepositoryPolicy {
        CloneRepositoryPolicy {
            enable: self.enable || other.enable,
            options: CloneRepositoryOptions {
                artifacts: self.options.artifacts || other.options.artifacts,
                cache: self.options.cache || other.options.cache,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == CloneRepositoryPolicy::default()
    }
}

/// Downstream pipelines to launch when this one finishes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Launch {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub when_fail: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub when_success: Vec<String>,
}

impl Launch {
    pub fn is_empty(&self) -> bool {
        self.when_fail.is_empty() && self.when_success.is_empty()
    }
}

/// Tasks that run once the main graph has failed or succeeded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinishTasks {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fail: BTreeMap<String, Task>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub success: BTreeMap<String, Task>,
}

impl FinishTasks {
    pub fn is_empty(&self) -> bool {
        self.fail.is_empty() && self.success.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_union_only_adds() {
        let pipeline = CloneRepositoryPolicy {
            enable: true,
            options: CloneRepositoryOptions {
                artifacts: false,
                cache: true,
            },
        };
        let task = CloneRepositoryPolicy {
            enable: false,
            options: CloneRepositoryOptions {
                artifacts: true,
                cache: false,
            },
        };

        let effective = pipeline.union(task);
        assert!(effective.enable);
        assert!(effective.options.artifacts);
        assert!(effective.options.cache);
    }

    #[test]
    fn test_parse_pipeline_yaml() {
        let yaml = r#"
description: Build and test
namespace:
  name: ci
  create: true
cloneRepository:
  enable: true
  options:
    artifacts: true
cloneDepth: 5
sshSecretName: git-ssh
launch:
  whenSuccess: [deploy]
params:
  REPOSITORY: git@example.com:team/app.git
  RETRIES: 3
tasks:
  build:
    steps:
      - name: compile
        image: rust:1.85
        script: cargo build
"#;

        let pipeline: Pipeline = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(pipeline.namespace.name, "ci");
        assert!(pipeline.clone_repository.enable);
        assert!(pipeline.clone_repository.options.artifacts);
        assert!(!pipeline.clone_repository.options.cache);
        assert_eq!(pipeline.clone_depth, 5);
        assert_eq!(pipeline.launch.when_success, vec!["deploy"]);
        assert_eq!(pipeline.param("RETRIES"), "3");
        assert_eq!(pipeline.param("MISSING"), "");
        assert_eq!(pipeline.tasks["build"].steps[0].image, "rust:1.85");
        assert!(pipeline.workspace.is_none());
    }

    #[test]
    fn test_compiler_fields_not_serialized_when_empty() {
        let pipeline = Pipeline {
            name: "build".to_string(),
            ..Default::default()
        };

        let json = serde_json::to_value(&pipeline).unwrap();
        assert!(json.get("cloneRepository").is_none());
        assert!(json.get("launch").is_none());
        assert!(json.get("namespace").is_none());
        assert_eq!(json["params"], serde_json::json!({}));
    }
}
