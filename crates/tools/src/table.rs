//! In-memory tabular values.
//!
//! A [`Table`] is an ordered list of named columns and an ordered list of
//! rows. Cells are JSON values so a column may hold heterogeneous types,
//! exactly like the row-sets exchanged with the HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt::Write as _;

/// Placeholder written in place of missing values after a step runs.
pub const MISSING_PLACEHOLDER: &str = "NaN";

/// Column name used when a scalar or a series is wrapped into a table.
pub const SCALAR_COLUMN: &str = "result";

/// Columns produced by index resets that never belong in a step's output.
pub const SYNTHETIC_INDEX_COLUMNS: &[&str] = &["index", "level_0", "Unnamed: 0"];

/// A single record, keyed by column name.
pub type Record = Map<String, Value>;

/// Inferred storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
    /// Nested arrays or objects.
    Json,
    /// Only missing values.
    Empty,
}

impl ColumnType {
    /// Infer the narrowest type holding every non-missing value.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut inferred = ColumnType::Empty;
        for value in values {
            let cell = match value {
                Value::Null => continue,
                Value::Bool(_) => ColumnType::Boolean,
                Value::Number(n) if n.is_i64() || n.is_u64() => ColumnType::Integer,
                Value::Number(_) => ColumnType::Float,
                Value::String(_) => ColumnType::Text,
                Value::Array(_) | Value::Object(_) => ColumnType::Json,
            };
            inferred = match (inferred, cell) {
                (ColumnType::Empty, c) => c,
                (a, b) if a == b => a,
                (ColumnType::Integer, ColumnType::Float) | (ColumnType::Float, ColumnType::Integer) => {
                    ColumnType::Float
                }
                _ => ColumnType::Text,
            };
        }
        inferred
    }

    /// Short dtype label used in schema summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "int64",
            ColumnType::Float => "float64",
            ColumnType::Boolean => "bool",
            ColumnType::Text => "object",
            ColumnType::Json => "object",
            ColumnType::Empty => "object",
        }
    }
}

/// Rows × named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create a table from columns and rows. Short rows are padded with
    /// missing values, long rows are truncated.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Build a table from records. Column order follows first appearance.
    pub fn from_records(records: &[Record]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Wrap a series into a single-column table.
    pub fn from_series(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            columns: vec![name.into()],
            rows: values.into_iter().map(|v| vec![v]).collect(),
        }
    }

    /// Wrap a scalar into a one-row, one-column table.
    pub fn from_scalar(value: Value) -> Self {
        Self::from_series(SCALAR_COLUMN, vec![value])
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of a column in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Append a row, padding or truncating it to the column count.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Replace or append a column. `values` must have one entry per row.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), String> {
        if !self.columns.is_empty() && values.len() != self.rows.len() {
            return Err(format!(
                "Length of values ({}) does not match number of rows ({})",
                values.len(),
                self.rows.len()
            ));
        }

        if self.columns.is_empty() {
            self.rows = values.iter().map(|_| Vec::new()).collect();
        }

        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Rename a column in place. Unknown names are ignored.
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if let Some(idx) = self.column_index(from) {
            self.columns[idx] = to.to_string();
        }
    }

    /// Remove the named columns. Unknown names are ignored.
    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !names.contains(&c.as_str()))
            .map(|(i, _)| i)
            .collect();

        if keep.len() == self.columns.len() {
            return;
        }

        self.columns = keep.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            *row = keep.iter().map(|&i| row[i].clone()).collect();
        }
    }

    /// Keep only the named columns, in the given order.
    pub fn select(&self, names: &[String]) -> Result<Table, String> {
        let indices = names
            .iter()
            .map(|n| {
                self.column_index(n)
                    .ok_or_else(|| format!("Column not found: {}", n))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Table {
            columns: names.to_vec(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Keep rows for which `keep` returns true.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&[Value]) -> bool) {
        self.rows.retain(|row| keep(row));
    }

    /// Stable sort of the rows.
    pub fn sort_rows(&mut self, mut compare: impl FnMut(&[Value], &[Value]) -> Ordering) {
        self.rows.sort_by(|a, b| compare(a, b));
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Replace every missing value with `value`.
    pub fn fill_missing(&mut self, value: &Value) {
        for cell in self.rows.iter_mut().flatten() {
            if cell.is_null() {
                *cell = value.clone();
            }
        }
    }

    /// Canonical shape of a step's output: synthetic index columns are
    /// dropped and missing values become [`MISSING_PLACEHOLDER`].
    pub fn normalize(mut self) -> Self {
        self.drop_columns(SYNTHETIC_INDEX_COLUMNS);
        self.fill_missing(&Value::String(MISSING_PLACEHOLDER.to_string()));
        self
    }

    /// Row as a record.
    pub fn record(&self, row: usize) -> Option<Record> {
        let values = self.rows.get(row)?;
        Some(
            self.columns
                .iter()
                .cloned()
                .zip(values.iter().cloned())
                .collect(),
        )
    }

    /// All rows as records.
    pub fn to_records(&self) -> Vec<Record> {
        (0..self.rows.len()).filter_map(|i| self.record(i)).collect()
    }

    /// Inferred type of every column, in column order.
    pub fn column_types(&self) -> Vec<ColumnType> {
        (0..self.columns.len())
            .map(|idx| ColumnType::infer(self.rows.iter().map(|row| &row[idx])))
            .collect()
    }

    /// Human-readable schema summary used when prompting for code.
    pub fn describe(&self, name: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "--- DataFrame: '{}' ---", name);
        let _ = writeln!(out, "RangeIndex: {} entries", self.rows.len());
        let _ = writeln!(out, "Data columns (total {} columns):", self.columns.len());
        let _ = writeln!(out, " #   Column  Non-Null Count  Dtype");

        for (idx, (column, dtype)) in self.columns.iter().zip(self.column_types()).enumerate() {
            let non_null = self.rows.iter().filter(|row| !row[idx].is_null()).count();
            let _ = writeln!(
                out,
                " {:<3} {}  {} non-null  {}",
                idx,
                column,
                non_null,
                dtype.as_str()
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn test_from_records_keeps_first_appearance_order() {
        let table = Table::from_records(&records(json!([
            {"b": 1, "a": "x"},
            {"a": "y", "c": true}
        ])));

        assert_eq!(table.columns(), &["b", "a", "c"]);
        assert_eq!(table.rows()[1], vec![Value::Null, json!("y"), json!(true)]);
    }

    #[test]
    fn test_normalize_drops_index_columns_and_fills_missing() {
        let table = Table::from_rows(
            vec!["index".into(), "amount".into(), "level_0".into()],
            vec![vec![json!(0), json!(10.5), json!(0)], vec![json!(1), Value::Null, json!(1)]],
        )
        .normalize();

        assert_eq!(table.columns(), &["amount"]);
        assert_eq!(table.rows()[1], vec![json!("NaN")]);
    }

    #[test]
    fn test_set_column_length_mismatch() {
        let mut table = Table::from_series("a", vec![json!(1), json!(2)]);
        assert!(table.set_column("b", vec![json!(1)]).is_err());
        table.set_column("b", vec![json!(3), json!(4)]).unwrap();
        assert_eq!(table.columns(), &["a", "b"]);
    }

    #[test]
    fn test_column_type_inference() {
        assert_eq!(ColumnType::infer(&[json!(1), json!(2)]), ColumnType::Integer);
        assert_eq!(ColumnType::infer(&[json!(1), json!(2.5)]), ColumnType::Float);
        assert_eq!(ColumnType::infer(&[json!(1), json!("x")]), ColumnType::Text);
        assert_eq!(ColumnType::infer(&[Value::Null]), ColumnType::Empty);
    }

    #[test]
    fn test_describe_lists_columns() {
        let table = Table::from_series("amount", vec![json!(1.5), Value::Null]);
        let summary = table.describe("df_gl");
        assert!(summary.contains("'df_gl'"));
        assert!(summary.contains("RangeIndex: 2 entries"));
        assert!(summary.contains("amount  1 non-null  float64"));
    }
}
