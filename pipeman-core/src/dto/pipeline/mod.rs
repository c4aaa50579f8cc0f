//! Pipeline custom resource submitted to the cluster

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::pipeline::{Namespace, Pipeline};
use crate::names;

pub const API_VERSION: &str = "pipe-manager.org/v1alpha1";
pub const KIND: &str = "Pipeline";

/// Label carrying the source pipeline name
pub const PIPELINE_LABEL: &str = "pipe-manager.org/pipeline";
/// Label carrying the launcher invocation id
pub const LAUNCH_ID_LABEL: &str = "pipe-manager.org/launch-id";

/// Deployable pipeline object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineObject {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: Pipeline,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl PipelineObject {
    /// Wraps a normalized pipeline
    ///
    /// The target namespace is the pipeline's own `namespace.name` when set,
    /// otherwise `default_namespace`. The namespace block is removed from the
    /// spec: it only tells the deployer where to put the object.
    pub fn new(mut spec: Pipeline, default_namespace: &str, launch_id: &str) -> Self {
        let namespace = std::mem::take(&mut spec.namespace);
        let namespace = if namespace.name.is_empty() {
            default_namespace.to_string()
        } else {
            namespace.name
        };

        let mut labels = BTreeMap::new();
        labels.insert(PIPELINE_LABEL.to_string(), spec.name.clone());
        if !launch_id.is_empty() {
            labels.insert(LAUNCH_ID_LABEL.to_string(), launch_id.to_string());
        }

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ObjectMeta {
                name: names::object_name(&spec.name),
                namespace,
                labels,
            },
            spec,
        }
    }

    /// Namespace settings the deployer needs when it must create the namespace
    pub fn namespace_request(pipeline: &Pipeline) -> Option<&Namespace> {
        (pipeline.namespace.create && !pipeline.namespace.name.is_empty())
            .then_some(&pipeline.namespace)
    }
}
