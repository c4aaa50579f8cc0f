//! Conversion of working copies into typed pipelines

use pipeman_core::domain::pipeline::Pipeline;
use serde_yaml::Value;

use crate::error::{CompileError, Result};
use crate::select::SelectedPipeline;

/// Deserializes a selected working copy into a [`Pipeline`]
///
/// The pipeline's name is always its document key, whatever the node says.
///
/// # Errors
/// Returns [`CompileError::Convert`] if the node does not fit the pipeline
/// structure (wrong field types, malformed tasks or steps).
pub fn to_pipeline(selected: SelectedPipeline) -> Result<Pipeline> {
    let SelectedPipeline { name, node } = selected;

    let mut pipeline: Pipeline =
        serde_yaml::from_value(Value::Mapping(node)).map_err(|source| CompileError::Convert {
            pipeline: name.clone(),
            source,
        })?;
    pipeline.name = name;

    Ok(pipeline)
}
