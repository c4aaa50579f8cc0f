//! Pipeman pipeline compiler
//!
//! This crate turns a tree of YAML pipeline fragments into normalized
//! pipelines ready to deploy. It includes:
//! - Document merger for fragment trees
//! - Pipeline selection by name or by trigger
//! - Conversion of working copies into typed pipelines
//! - Normalization: step injection, volumes, batch expansion, continuations
//!
//! The compiler is synchronous and keeps no global state. Every call gets
//! its inputs through a [`CompileContext`].

pub mod context;
pub mod convert;
pub mod error;
pub mod merge;
pub mod normalize;
pub mod select;
pub mod variables;

pub use context::{BucketSettings, CompileContext, LogSettings};
pub use error::{CompileError, Result};
pub use merge::{PipelineDocument, deep_merge, load_tree};
pub use normalize::normalize;
pub use select::{
    SelectedPipeline, Selection, SelectionDiagnostic, SelectionMode, TriggerEvaluationError,
    select,
};
pub use variables::RuntimeVariables;

use pipeman_core::domain::pipeline::Pipeline;
use std::path::Path;

/// Converts and normalizes one selected pipeline
///
/// # Errors
/// Returns [`CompileError::Convert`] if the working copy does not fit the
/// pipeline structure.
pub fn compile(selected: SelectedPipeline, ctx: &CompileContext) -> Result<Pipeline> {
    let pipeline = convert::to_pipeline(selected)?;
    Ok(normalize(pipeline, ctx))
}

/// Output of a full compile run
#[derive(Debug, Clone, Default)]
pub struct CompileOutput {
    pub pipelines: Vec<Pipeline>,
    pub diagnostics: Vec<SelectionDiagnostic>,
}

/// Loads, selects and compiles every pipeline for this invocation
///
/// Selection mode comes from the runtime variables in `ctx`.
///
/// # Arguments
/// * `root` - Directory holding the pipeline fragments
/// * `ctx` - Launcher settings and runtime variables
///
/// # Errors
/// Any merge or conversion error aborts the run; nothing is returned for
/// pipelines compiled before the failure.
pub fn compile_tree(root: &Path, ctx: &CompileContext) -> Result<CompileOutput> {
    let document = load_tree(root)?;
    let mode = SelectionMode::from_variables(&ctx.variables);
    let selection = select(&document, &ctx.variables, &mode);

    let pipelines = selection
        .pipelines
        .into_iter()
        .map(|selected| compile(selected, ctx))
        .collect::<Result<Vec<_>>>()?;

    Ok(CompileOutput {
        pipelines,
        diagnostics: selection.diagnostics,
    })
}
