//! In-memory column table.
//!
//! The dataset is a rectangular, order-preserving mapping from column name
//! to a column of equal length. Operations never mutate a table in place:
//! every filter/aggregate call produces a new `Table`, leaving the
//! caller's table unchanged.

pub mod filter;
pub mod value;

pub use filter::{apply_filters, ColumnFilter, FilterSpec, PredicateSet};
pub use value::Value;

use serde::{Deserialize, Serialize};

use crate::error::TableError;

// ============================================================================
// Data types
// ============================================================================

/// Broad column type, inferred once after load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Numeric,
    Datetime,
    Categorical,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Datetime => "datetime",
            Self::Categorical => "categorical",
        }
    }
}

/// Column name to inferred type mapping, order-preserving.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entries: Vec<(String, DataType)>,
}

impl Schema {
    pub fn new(entries: Vec<(String, DataType)>) -> Self {
        Self { entries }
    }

    /// Derive a schema directly from the cells of a table.
    pub fn of(table: &Table) -> Self {
        let entries = table
            .column_names()
            .iter()
            .map(|name| (name.to_string(), table.column_type(name)))
            .collect();
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<DataType> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| *t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, DataType)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), *t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Table
// ============================================================================

/// A named column of cells.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

/// Rectangular dataset: unique, order-preserving column names with columns
/// of equal length.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(name, values)` pairs, validating that names
    /// are unique and all columns share one length.
    pub fn from_columns(
        columns: Vec<(String, Vec<Value>)>,
    ) -> std::result::Result<Self, TableError> {
        let mut out: Vec<Column> = Vec::with_capacity(columns.len());
        let expected = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        for (name, values) in columns {
            if out.iter().any(|c| c.name == name) {
                return Err(TableError::DuplicateColumn(name));
            }
            if values.len() != expected {
                return Err(TableError::LengthMismatch {
                    column: name,
                    expected,
                    got: values.len(),
                });
            }
            out.push(Column { name, values });
        }
        Ok(Self { columns: out })
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Broad type of a column, judged from its non-null cells. A column is
    /// numeric (or datetime) only if every non-null cell is.
    pub fn column_type(&self, name: &str) -> DataType {
        let Some(values) = self.column(name) else {
            return DataType::Categorical;
        };
        let mut saw_numeric = false;
        let mut saw_datetime = false;
        for v in values {
            match v {
                Value::Null => {}
                Value::Int(_) | Value::Float(_) | Value::Bool(_) => saw_numeric = true,
                Value::DateTime(_) => saw_datetime = true,
                Value::Str(_) => return DataType::Categorical,
            }
            if saw_numeric && saw_datetime {
                return DataType::Categorical;
            }
        }
        if saw_numeric {
            DataType::Numeric
        } else if saw_datetime {
            DataType::Datetime
        } else {
            DataType::Categorical
        }
    }

    /// Names of numeric columns, in table order.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| self.column_type(&c.name) == DataType::Numeric)
            .map(|c| c.name.clone())
            .collect()
    }

    /// One row as a cell slice, in column order.
    pub fn row(&self, index: usize) -> Vec<&Value> {
        self.columns.iter().map(|c| &c.values[index]).collect()
    }

    /// New table holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: indices.iter().map(|&i| c.values[i].clone()).collect(),
            })
            .collect();
        Table { columns }
    }

    pub fn head(&self, n: usize) -> Table {
        let take = n.min(self.n_rows());
        let indices: Vec<usize> = (0..take).collect();
        self.select_rows(&indices)
    }

    pub fn tail(&self, n: usize) -> Table {
        let rows = self.n_rows();
        let skip = rows.saturating_sub(n);
        let indices: Vec<usize> = (skip..rows).collect();
        self.select_rows(&indices)
    }

    /// Append a column, replacing any existing column of the same name.
    pub fn insert_column(
        &mut self,
        name: &str,
        values: Vec<Value>,
    ) -> std::result::Result<(), TableError> {
        if !self.columns.is_empty() && values.len() != self.n_rows() {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.n_rows(),
                got: values.len(),
            });
        }
        if let Some(existing) = self.columns.iter_mut().find(|c| c.name == name) {
            existing.values = values;
        } else {
            self.columns.push(Column {
                name: name.to_string(),
                values,
            });
        }
        Ok(())
    }

    /// Render up to `limit` rows as aligned plain text.
    pub fn render(&self, limit: usize) -> String {
        if self.columns.is_empty() {
            return "(empty table)".to_string();
        }
        let rows = limit.min(self.n_rows());
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.name.len()).collect();
        let mut cells: Vec<Vec<String>> = Vec::with_capacity(rows);
        for i in 0..rows {
            let row: Vec<String> = self
                .columns
                .iter()
                .map(|c| c.values[i].to_string())
                .collect();
            for (j, cell) in row.iter().enumerate() {
                widths[j] = widths[j].max(cell.len());
            }
            cells.push(row);
        }

        let mut out = String::new();
        let header: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(j, c)| format!("{:>width$}", c.name, width = widths[j]))
            .collect();
        out.push_str(&header.join("  "));
        for row in &cells {
            out.push('\n');
            let line: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(j, cell)| format!("{:>width$}", cell, width = widths[j]))
                .collect();
            out.push_str(&line.join("  "));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_columns(vec![
            (
                "region".to_string(),
                vec![Value::from("A"), Value::from("A"), Value::Null, Value::from("B")],
            ),
            (
                "volume".to_string(),
                vec![
                    Value::Float(1.5),
                    Value::Float(2.5),
                    Value::Float(3.0),
                    Value::Null,
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_columns_rejects_mismatched_lengths() {
        let err = Table::from_columns(vec![
            ("a".to_string(), vec![Value::Int(1)]),
            ("b".to_string(), vec![]),
        ])
        .unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { .. }));
    }

    #[test]
    fn test_from_columns_rejects_duplicates() {
        let err = Table::from_columns(vec![
            ("a".to_string(), vec![Value::Int(1)]),
            ("a".to_string(), vec![Value::Int(2)]),
        ])
        .unwrap_err();
        assert!(matches!(err, TableError::DuplicateColumn(_)));
    }

    #[test]
    fn test_head_tail() {
        let t = sample();
        assert_eq!(t.head(2).n_rows(), 2);
        assert_eq!(t.tail(1).n_rows(), 1);
        assert_eq!(t.tail(1).column("region").unwrap()[0], Value::from("B"));
        assert_eq!(t.head(10).n_rows(), 4);
    }

    #[test]
    fn test_column_type() {
        let t = sample();
        assert_eq!(t.column_type("volume"), DataType::Numeric);
        assert_eq!(t.column_type("region"), DataType::Categorical);
        assert_eq!(t.column_type("missing"), DataType::Categorical);
    }

    #[test]
    fn test_select_rows_copies() {
        let t = sample();
        let picked = t.select_rows(&[3, 0]);
        assert_eq!(picked.n_rows(), 2);
        assert_eq!(picked.column("region").unwrap()[0], Value::from("B"));
        // original unchanged
        assert_eq!(t.n_rows(), 4);
    }

    #[test]
    fn test_insert_column_replaces() {
        let mut t = sample();
        t.insert_column("volume", vec![Value::Int(1); 4]).unwrap();
        assert_eq!(t.n_cols(), 2);
        assert_eq!(t.column("volume").unwrap()[0], Value::Int(1));
    }

    #[test]
    fn test_render_alignment() {
        let t = sample();
        let text = t.render(10);
        let mut lines = text.lines();
        assert!(lines.next().unwrap().contains("region"));
        assert_eq!(lines.count(), 4);
    }
}
