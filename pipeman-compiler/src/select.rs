//! Pipeline selector
//!
//! Decides which pipelines of a merged document run for the current
//! invocation and builds a self-contained working copy of each one.
//!
//! Two modes are supported:
//! - **Name mode**: `PIPELINE_NAME` is set and exactly that pipeline is
//!   selected, triggers ignored
//! - **Trigger mode**: every pipeline whose triggers all match the runtime
//!   variables is selected
//!
//! Problems with individual pipelines never abort selection. They are logged
//! and returned as [`SelectionDiagnostic`]s next to the selected pipelines.

use pipeman_core::domain::trigger::{TRIGGERS_KEY, Trigger};
use regex::Regex;
use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::merge::{GLOBAL_KEY, PipelineDocument, deep_merge};
use crate::variables::RuntimeVariables;

/// Key of the parameter mapping that runtime variables are injected into
pub const PARAMS_KEY: &str = "params";

/// How pipelines are chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionMode {
    ByName(String),
    ByTrigger,
}

impl SelectionMode {
    /// Name mode when `NAME` is set and non-empty, trigger mode otherwise
    pub fn from_variables(variables: &RuntimeVariables) -> Self {
        match variables.pipeline_name() {
            Some(name) => SelectionMode::ByName(name.to_string()),
            None => SelectionMode::ByTrigger,
        }
    }
}

/// A pipeline picked for this run, already merged with `global`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedPipeline {
    pub name: String,
    pub node: Mapping,
}

/// Result of a selection pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Selected pipelines, ordered by name
    pub pipelines: Vec<SelectedPipeline>,
    pub diagnostics: Vec<SelectionDiagnostic>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.pipelines.iter().map(|p| p.name.as_str()).collect()
    }
}

/// A trigger regex failed to compile
///
/// The trigger counts as not matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Pipeline '{pipeline}': invalid regex '{regex}' for variable {variable}: {message}")]
pub struct TriggerEvaluationError {
    pub pipeline: String,
    pub variable: String,
    pub regex: String,
    pub message: String,
}

/// Non-fatal problem found while selecting
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionDiagnostic {
    /// The pipeline has no trigger list and can only run by name
    #[error("Pipeline '{pipeline}' declares no triggers")]
    NoTriggers { pipeline: String },

    /// The trigger list exists but is not a list of triggers
    #[error("Pipeline '{pipeline}' has malformed triggers: {reason}")]
    MalformedTriggers { pipeline: String, reason: String },

    #[error(transparent)]
    TriggerEvaluation(#[from] TriggerEvaluationError),

    /// The pipeline entry is not a mapping
    #[error("Pipeline '{pipeline}' is not a mapping")]
    UnexpectedNode { pipeline: String },
}

/// Selects the pipelines of `document` that run for `variables`
///
/// # Arguments
/// * `document` - The merged fragment document
/// * `variables` - Runtime variables; their params form is injected into
///   every selected pipeline
/// * `mode` - Name or trigger selection
///
/// # Returns
/// The selected working copies and any diagnostics. An empty selection is a
/// valid result.
pub fn select(
    document: &PipelineDocument,
    variables: &RuntimeVariables,
    mode: &SelectionMode,
) -> Selection {
    let global = document.global();
    let mut selection = Selection::default();

    match mode {
        SelectionMode::ByName(name) => {
            if name == GLOBAL_KEY {
                warn!("'{}' holds shared defaults and cannot be selected", GLOBAL_KEY);
            } else if let Some(node) = document.get(name) {
                match node.as_mapping() {
                    Some(node) => selection.pipelines.push(SelectedPipeline {
                        name: name.clone(),
                        node: working_copy(global, node, variables),
                    }),
                    None => unexpected_node(&mut selection, name),
                }
            } else {
                warn!("Pipeline '{}' not found", name);
            }
        }
        SelectionMode::ByTrigger => {
            for (name, node) in document.pipelines() {
                let Some(node) = node.as_mapping() else {
                    unexpected_node(&mut selection, name);
                    continue;
                };

                if triggers_match(name, node, variables, &mut selection.diagnostics) {
                    debug!("Pipeline '{}' selected by triggers", name);
                    selection.pipelines.push(SelectedPipeline {
                        name: name.to_string(),
                        node: working_copy(global, node, variables),
                    });
                }
            }
        }
    }

    info!(
        "Selected {} pipeline(s): [{}]",
        selection.pipelines.len(),
        selection.names().join(", ")
    );

    selection
}

fn unexpected_node(selection: &mut Selection, name: &str) {
    let diagnostic = SelectionDiagnostic::UnexpectedNode {
        pipeline: name.to_string(),
    };
    warn!("{}", diagnostic);
    selection.diagnostics.push(diagnostic);
}

/// Evaluates the trigger list of one pipeline; every trigger must match
fn triggers_match(
    name: &str,
    node: &Mapping,
    variables: &RuntimeVariables,
    diagnostics: &mut Vec<SelectionDiagnostic>,
) -> bool {
    let triggers = match node.get(TRIGGERS_KEY) {
        None | Some(Value::Null) => Vec::new(),
        Some(raw) => match serde_yaml::from_value::<Vec<Trigger>>(raw.clone()) {
            Ok(triggers) => triggers,
            Err(err) => {
                let diagnostic = SelectionDiagnostic::MalformedTriggers {
                    pipeline: name.to_string(),
                    reason: err.to_string(),
                };
                warn!("{}", diagnostic);
                diagnostics.push(diagnostic);
                return false;
            }
        },
    };

    if triggers.is_empty() {
        let diagnostic = SelectionDiagnostic::NoTriggers {
            pipeline: name.to_string(),
        };
        warn!("{}, skipping", diagnostic);
        diagnostics.push(diagnostic);
        return false;
    }

    for trigger in &triggers {
        let variable = trigger.variable_key();
        let value = variables.get(&variable);

        let regex = match Regex::new(&trigger.value_regex) {
            Ok(regex) => regex,
            Err(err) => {
                let error = TriggerEvaluationError {
                    pipeline: name.to_string(),
                    variable,
                    regex: trigger.value_regex.clone(),
                    message: err.to_string(),
                };
                warn!("{}", error);
                diagnostics.push(error.into());
                return false;
            }
        };

        if !regex.is_match(value) {
            debug!(
                "Pipeline '{}': {}='{}' does not match '{}'",
                name, variable, value, trigger.value_regex
            );
            return false;
        }
    }

    true
}

/// Builds the self-contained copy of a selected pipeline
///
/// Starts from `global`, deep-merges the pipeline on top, injects the
/// runtime variables into `params` and drops the trigger list. The document
/// itself is left untouched.
fn working_copy(
    global: Option<&Mapping>,
    node: &Mapping,
    variables: &RuntimeVariables,
) -> Mapping {
    let mut pipeline = global.cloned().unwrap_or_default();
    deep_merge(&mut pipeline, node.clone());

    if matches!(pipeline.get(PARAMS_KEY), None | Some(Value::Null)) {
        pipeline.insert(Value::from(PARAMS_KEY), Value::Mapping(Mapping::new()));
    }
    if let Some(Value::Mapping(params)) = pipeline.get_mut(PARAMS_KEY) {
        for (key, value) in variables.as_params() {
            params.insert(Value::String(key), Value::String(value));
        }
    }

    pipeline.remove(TRIGGERS_KEY);
    pipeline
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
global:
  cloneDepth: 5
  params:
    SHARED: global
    OVERRIDE: global
build:
  params:
    OVERRIDE: build
  pipelineTriggers:
    - variableName: event
      valueRegex: ^push$
    - variableName: branch
      valueRegex: ^main$
release:
  pipelineTriggers:
    - variableName: event
      valueRegex: ^tag$
manual:
  description: only by name
"#;

    fn document() -> PipelineDocument {
        PipelineDocument::from_yaml(DOCUMENT).unwrap()
    }

    fn vars(pairs: &[(&str, &str)]) -> RuntimeVariables {
        pairs.iter().copied().collect()
    }

    fn param<'a>(pipeline: &'a SelectedPipeline, key: &str) -> Option<&'a str> {
        pipeline
            .node
            .get(PARAMS_KEY)
            .and_then(|params| params.get(key))
            .and_then(Value::as_str)
    }

    #[test]
    fn test_mode_from_variables() {
        assert_eq!(
            SelectionMode::from_variables(&vars(&[("NAME", "build")])),
            SelectionMode::ByName("build".to_string())
        );
        assert_eq!(
            SelectionMode::from_variables(&vars(&[("NAME", "")])),
            SelectionMode::ByTrigger
        );
    }

    #[test]
    fn test_all_triggers_must_match() {
        let variables = vars(&[("EVENT", "push"), ("BRANCH", "main")]);
        let selection = select(&document(), &variables, &SelectionMode::ByTrigger);
        assert_eq!(selection.names(), vec!["build"]);

        let variables = vars(&[("EVENT", "push"), ("BRANCH", "dev")]);
        let selection = select(&document(), &variables, &SelectionMode::ByTrigger);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_missing_variable_matches_as_empty() {
        let doc = PipelineDocument::from_yaml(
            "any:\n  pipelineTriggers:\n    - {variableName: missing, valueRegex: '^$'}",
        )
        .unwrap();
        let selection = select(&doc, &RuntimeVariables::new(), &SelectionMode::ByTrigger);
        assert_eq!(selection.names(), vec!["any"]);
    }

    #[test]
    fn test_pipeline_without_triggers_is_skipped() {
        let variables = vars(&[("EVENT", "tag")]);
        let selection = select(&document(), &variables, &SelectionMode::ByTrigger);

        assert_eq!(selection.names(), vec!["release"]);
        assert!(selection.diagnostics.contains(&SelectionDiagnostic::NoTriggers {
            pipeline: "manual".to_string()
        }));
    }

    #[test]
    fn test_name_mode_ignores_triggers() {
        let selection = select(
            &document(),
            &vars(&[("NAME", "manual")]),
            &SelectionMode::ByName("manual".to_string()),
        );
        assert_eq!(selection.names(), vec!["manual"]);
        assert!(selection.diagnostics.is_empty());
    }

    #[test]
    fn test_name_mode_unknown_pipeline() {
        let selection = select(
            &document(),
            &RuntimeVariables::new(),
            &SelectionMode::ByName("nope".to_string()),
        );
        assert!(selection.is_empty());

        let selection = select(
            &document(),
            &RuntimeVariables::new(),
            &SelectionMode::ByName("global".to_string()),
        );
        assert!(selection.is_empty());
    }

    #[test]
    fn test_working_copy_merges_global_and_injects_variables() {
        let variables = vars(&[("NAME", "build"), ("GIT_BRANCH", "main")]);
        let selection = select(
            &document(),
            &variables,
            &SelectionMode::ByName("build".to_string()),
        );
        let build = &selection.pipelines[0];

        assert_eq!(param(build, "SHARED"), Some("global"));
        assert_eq!(param(build, "OVERRIDE"), Some("build"));
        assert_eq!(param(build, "GIT-BRANCH"), Some("main"));
        assert_eq!(param(build, "NAME"), Some("build"));
        assert_eq!(build.node.get("cloneDepth").and_then(Value::as_u64), Some(5));
        assert!(build.node.get(TRIGGERS_KEY).is_none());
    }

    #[test]
    fn test_working_copy_creates_params() {
        let doc = PipelineDocument::from_yaml("solo: {description: x}").unwrap();
        let selection = select(
            &doc,
            &vars(&[("EVENT", "push")]),
            &SelectionMode::ByName("solo".to_string()),
        );
        assert_eq!(param(&selection.pipelines[0], "EVENT"), Some("push"));
    }

    #[test]
    fn test_selection_leaves_document_untouched() {
        let doc = document();
        let before = doc.clone();
        select(
            &doc,
            &vars(&[("EVENT", "push"), ("BRANCH", "main")]),
            &SelectionMode::ByTrigger,
        );
        assert_eq!(doc, before);
    }

    #[test]
    fn test_invalid_regex_is_reported() {
        let doc = PipelineDocument::from_yaml(
            "broken:\n  pipelineTriggers:\n    - {variableName: event, valueRegex: '(unclosed'}",
        )
        .unwrap();
        let selection = select(&doc, &vars(&[("EVENT", "x")]), &SelectionMode::ByTrigger);

        assert!(selection.is_empty());
        assert!(matches!(
            &selection.diagnostics[..],
            [SelectionDiagnostic::TriggerEvaluation(TriggerEvaluationError { variable, .. })]
                if variable == "EVENT"
        ));
    }

    #[test]
    fn test_malformed_triggers_and_nodes() {
        let doc = PipelineDocument::from_yaml(
            "odd:\n  pipelineTriggers: not-a-list\nscalar: 42",
        )
        .unwrap();
        let selection = select(&doc, &RuntimeVariables::new(), &SelectionMode::ByTrigger);

        assert!(selection.is_empty());
        assert_eq!(selection.diagnostics.len(), 2);
        assert!(selection.diagnostics.contains(&SelectionDiagnostic::UnexpectedNode {
            pipeline: "scalar".to_string()
        }));
    }
}
