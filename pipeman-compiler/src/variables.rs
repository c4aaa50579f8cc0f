//! Runtime variables
//!
//! The launcher receives its invocation context through `PIPELINE_`-prefixed
//! environment variables. This module strips the prefix and exposes the
//! result as an ordered map that the selector and normalizer read from.

use std::collections::BTreeMap;

/// Environment prefix of runtime variables
pub const VARIABLE_PREFIX: &str = "PIPELINE_";

/// Variable that switches selection to name mode
pub const NAME: &str = "NAME";
/// Parameter holding the repository to clone
pub const REPOSITORY: &str = "REPOSITORY";
/// Parameter holding the commit to check out
pub const COMMIT: &str = "COMMIT";

/// Ordered key/value map of runtime variables, prefix already stripped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeVariables(BTreeMap<String, String>);

impl RuntimeVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the `PIPELINE_*` variables of the current process
    pub fn from_env() -> Self {
        Self::from_prefixed(std::env::vars(), VARIABLE_PREFIX)
    }

    /// Keeps the pairs whose key starts with `prefix`, with the prefix removed
    ///
    /// Keys that are exactly the prefix are ignored.
    pub fn from_prefixed<I>(vars: I, prefix: &str) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(prefix)
                    .filter(|stripped| !stripped.is_empty())
                    .map(|stripped| (stripped.to_string(), value))
            })
            .collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Value of `key`, or the empty string when absent
    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }

    /// Pipeline requested by name, if any
    pub fn pipeline_name(&self) -> Option<&str> {
        Some(self.get(NAME)).filter(|name| !name.is_empty())
    }

    pub fn repository(&self) -> &str {
        self.get(REPOSITORY)
    }

    pub fn commit(&self) -> &str {
        self.get(COMMIT)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Variables as pipeline parameters: `_` in keys becomes `-`
    pub fn as_params(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.0
            .iter()
            .map(|(key, value)| (key.replace('_', "-"), value.clone()))
    }
}

impl<K, V> FromIterator<(K, V)> for RuntimeVariables
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
