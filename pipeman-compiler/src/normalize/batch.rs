//! Batch expansion
//!
//! A task with a `batch` map is replaced by one task per batch entry, named
//! `<task>-<batch>` and carrying the entry's parameter overrides.

use pipeman_core::domain::task::Task;
use pipeman_core::names;

/// Expands `task` into its batch units
///
/// A task without batches comes back unchanged under its own name. Each unit
/// is an independent copy of the task with the batch map cleared and the
/// batch's parameters layered over the task's.
pub fn expand(name: &str, mut task: Task) -> Vec<(String, Task)> {
    if task.batch.is_empty() {
        return vec![(name.to_string(), task)];
    }

    let batches = std::mem::take(&mut task.batch);
    batches
        .into_iter()
        .map(|(batch_name, overrides)| {
            let mut unit = task.clone();
            unit.params.extend(overrides);
            (names::combine(name, &batch_name), unit)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn batch_task() -> Task {
        let yaml = r#"
params: {OS: any, KEEP: yes}
batch:
  linux: {OS: linux}
  windows: {OS: windows}
"#;
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_expands_one_task_per_batch() {
        let units = expand("test", batch_task());
        let names: Vec<&str> = units.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["test-linux", "test-windows"]);

        for (name, unit) in &units {
            assert!(unit.batch.is_empty());
            assert_eq!(unit.params["KEEP"], "yes");
            assert!(name.ends_with(&unit.params["OS"]));
        }
    }

    #[test]
    fn test_units_are_independent() {
        let mut units = expand("test", batch_task());
        units[0].1.params.insert("EXTRA".to_string(), "x".to_string());
        assert!(!units[1].1.params.contains_key("EXTRA"));
    }

    #[test]
    fn test_without_batch_is_identity() {
        let task = Task {
            params: BTreeMap::from([("A".to_string(), "1".to_string())]),
            ..Default::default()
        };
        let units = expand("build", task.clone());
        assert_eq!(units, vec![("build".to_string(), task)]);
    }

    #[test]
    fn test_long_names_are_truncated() {
        let mut task = Task::default();
        task.batch.insert("b".repeat(10), BTreeMap::new());
        let units = expand(&"t".repeat(58), task);
        assert_eq!(units[0].0.len(), names::COMBINED_NAME_MAX);
    }
}
