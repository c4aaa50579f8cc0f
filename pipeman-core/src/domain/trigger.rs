//! Trigger domain types

use serde::{Deserialize, Serialize};

/// Document key holding a pipeline's trigger list
pub const TRIGGERS_KEY: &str = "pipelineTriggers";

/// One selection condition: the named runtime variable must match the regex
///
/// A pipeline is auto-selected only when every trigger in its list matches.
/// Variable names are compared upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub variable_name: String,
    pub value_regex: String,
}

impl Trigger {
    /// Variable name as looked up in the runtime variables
    pub fn variable_key(&self) -> String {
        self.variable_name.to_uppercase()
    }
}
