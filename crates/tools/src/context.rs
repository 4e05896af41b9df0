//! Dataset context for step execution.

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::table::{Record, Table};

/// Context key under which a persisted table is exposed to step code.
pub fn dataset_key(table_name: &str) -> String {
    format!("df_{}", table_name)
}

/// Context key under which a step's output is exposed to later steps.
pub fn step_key(numeric_id: i64) -> String {
    format!("df_step_{}", numeric_id)
}

/// Run-scoped mapping from symbolic names to tables.
///
/// Built fresh for every run and extended as steps produce output. Entries
/// keep insertion order so schema summaries are stable.
#[derive(Debug, Clone, Default)]
pub struct DatasetContext {
    /// Run this context belongs to, if any.
    pub run_id: Option<String>,

    datasets: IndexMap<String, Table>,
}

impl DatasetContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from raw record sets, as sent by the HTTP surface.
    pub fn from_records(datasets: &HashMap<String, Vec<Record>>) -> Self {
        let mut names: Vec<&String> = datasets.keys().collect();
        names.sort();

        let mut ctx = Self::new();
        for name in names {
            ctx.insert(name.clone(), Table::from_records(&datasets[name]));
        }
        ctx
    }

    /// Tag the context with a run id.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Add or replace a dataset.
    pub fn insert(&mut self, name: impl Into<String>, table: Table) {
        self.datasets.insert(name.into(), table);
    }

    /// Get a dataset by name.
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.datasets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.datasets.contains_key(name)
    }

    /// Dataset names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.datasets.keys().map(|s| s.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Table)> {
        self.datasets.iter()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Schema summary of every dataset, for code generation prompts.
    pub fn describe(&self) -> String {
        self.datasets
            .iter()
            .map(|(name, table)| table.describe(name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys() {
        assert_eq!(dataset_key("gl_transactions"), "df_gl_transactions");
        assert_eq!(step_key(3), "df_step_3");
    }

    #[test]
    fn test_context_insert_and_order() {
        let mut ctx = DatasetContext::new().with_run_id("run_1");
        ctx.insert("df_b", Table::from_scalar(json!(1)));
        ctx.insert("df_a", Table::from_scalar(json!(2)));

        assert_eq!(ctx.run_id.as_deref(), Some("run_1"));
        assert_eq!(ctx.names(), vec!["df_b", "df_a"]);
        assert!(ctx.contains("df_a"));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_context_from_records() {
        let mut raw = HashMap::new();
        raw.insert(
            "df_x".to_string(),
            vec![json!({"a": 1}).as_object().unwrap().clone()],
        );

        let ctx = DatasetContext::from_records(&raw);
        assert_eq!(ctx.get("df_x").unwrap().num_rows(), 1);
        assert!(ctx.describe().contains("'df_x'"));
    }
}
