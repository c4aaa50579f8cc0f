//! Deployment of compiled pipelines
//!
//! The [`Deployer`] trait is where compiled objects leave the launcher. The
//! built-in [`ManifestDeployer`] renders them as YAML manifests, either to
//! stdout as a multi-document stream or as one file per object, ready for
//! the cluster client.

use anyhow::{Context, Result};
use async_trait::async_trait;
use pipeman_core::domain::pipeline::{Namespace, Pipeline};
use pipeman_core::dto::pipeline::PipelineObject;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Destination for compiled pipeline objects
#[async_trait]
pub trait Deployer: Send + Sync {
    /// Makes sure a namespace requested by a pipeline exists
    async fn ensure_namespace(&self, namespace: &Namespace) -> Result<()>;

    /// Submits one pipeline object
    async fn deploy(&self, object: &PipelineObject) -> Result<()>;
}

/// Writes manifests to stdout or to a directory
pub struct ManifestDeployer {
    output: Option<PathBuf>,
}

impl ManifestDeployer {
    /// Creates a deployer writing to `output`, or stdout when `None`
    pub fn new(output: Option<PathBuf>) -> Self {
        Self { output }
    }

    async fn write<T: Serialize + Sync>(&self, file_name: &str, manifest: &T) -> Result<()> {
        let yaml = serde_yaml::to_string(manifest).context("Failed to render manifest")?;

        match &self.output {
            Some(dir) => {
                tokio::fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                let path = dir.join(file_name);
                tokio::fs::write(&path, yaml)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Wrote manifest {}", path.display());
            }
            None => {
                let mut stdout = tokio::io::stdout();
                stdout
                    .write_all(format!("---\n{}", yaml).as_bytes())
                    .await
                    .context("Failed to write manifest to stdout")?;
                stdout.flush().await.context("Failed to flush stdout")?;
            }
        }

        Ok(())
    }
}

/// Namespace manifest for a pipeline that asked for its namespace to be created
pub fn namespace_manifest(namespace: &Namespace) -> serde_json::Value {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": namespace.name,
            "labels": namespace.labels,
        },
    })
}

#[async_trait]
impl Deployer for ManifestDeployer {
    async fn ensure_namespace(&self, namespace: &Namespace) -> Result<()> {
        let file_name = format!("namespace-{}.yaml", namespace.name);
        self.write(&file_name, &namespace_manifest(namespace)).await
    }

    async fn deploy(&self, object: &PipelineObject) -> Result<()> {
        let file_name = format!("{}.yaml", object.metadata.name);
        self.write(&file_name, object).await?;

        info!(
            "Pipeline '{}' deployed as {}/{}",
            object.spec.name, object.metadata.namespace, object.metadata.name
        );
        Ok(())
    }
}

/// Wraps and submits every compiled pipeline
///
/// Pipelines asking for their namespace to be created get it requested
/// first. Stops at the first failure.
///
/// # Returns
/// The number of deployed objects
pub async fn deploy_all(
    deployer: &dyn Deployer,
    pipelines: Vec<Pipeline>,
    default_namespace: &str,
    launch_id: &str,
) -> Result<usize> {
    let mut deployed = 0;

    for pipeline in pipelines {
        if let Some(namespace) = PipelineObject::namespace_request(&pipeline) {
            deployer
                .ensure_namespace(namespace)
                .await
                .with_context(|| format!("Failed to create namespace {}", namespace.name))?;
        }

        let object = PipelineObject::new(pipeline, default_namespace, launch_id);
        deployer
            .deploy(&object)
            .await
            .with_context(|| format!("Failed to deploy pipeline '{}'", object.spec.name))?;
        deployed += 1;
    }

    Ok(deployed)
}
