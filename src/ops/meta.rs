//! Metadata and inspection operations.

use std::collections::{BTreeMap, HashSet};

use crate::error::TableError;
use crate::table::{Table, Value};

/// Row and column counts.
pub fn meta_shape(table: &Table) -> Table {
    Table::from_columns(vec![
        ("rows".to_string(), vec![Value::Int(table.n_rows() as i64)]),
        (
            "columns".to_string(),
            vec![Value::Int(table.n_cols() as i64)],
        ),
    ])
    .expect("fresh columns share one length")
}

/// Column names with their inferred types.
pub fn meta_columns(table: &Table) -> Table {
    let names: Vec<Value> = table
        .column_names()
        .iter()
        .map(|n| Value::from(n.to_string()))
        .collect();
    let dtypes: Vec<Value> = table
        .column_names()
        .iter()
        .map(|n| Value::from(table.column_type(n).as_str()))
        .collect();
    Table::from_columns(vec![
        ("column".to_string(), names),
        ("dtype".to_string(), dtypes),
    ])
    .expect("fresh columns share one length")
}

/// First `n` rows.
pub fn meta_head(table: &Table, n: usize) -> Table {
    table.head(n)
}

/// Last `n` rows.
pub fn meta_tail(table: &Table, n: usize) -> Table {
    table.tail(n)
}

/// Summary statistics for the numeric columns, one row per column.
///
/// With no numeric columns the result is a single explanatory row rather
/// than an empty table.
pub fn meta_describe(table: &Table) -> Table {
    let numeric = table.numeric_columns();
    if numeric.is_empty() {
        return Table::from_columns(vec![(
            "note".to_string(),
            vec![Value::from("No numeric columns to describe.")],
        )])
        .expect("single fresh column");
    }

    let stats = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
    let mut columns: Vec<(String, Vec<Value>)> = Vec::with_capacity(stats.len() + 1);
    columns.push((
        "column".to_string(),
        numeric.iter().map(|n| Value::from(n.clone())).collect(),
    ));
    for stat in stats {
        columns.push((stat.to_string(), Vec::with_capacity(numeric.len())));
    }

    for name in &numeric {
        let mut values: Vec<f64> = table
            .column(name)
            .expect("numeric column exists")
            .iter()
            .filter_map(Value::as_f64)
            .collect();
        values.sort_by(f64::total_cmp);
        let row = describe_row(&values);
        for (slot, cell) in row.into_iter().enumerate() {
            columns[slot + 1].1.push(cell);
        }
    }
    Table::from_columns(columns).expect("fresh columns share one length")
}

fn describe_row(sorted: &[f64]) -> Vec<Value> {
    let count = Value::Int(sorted.len() as i64);
    if sorted.is_empty() {
        return vec![
            count,
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Null,
        ];
    }
    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let var = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    vec![
        count,
        Value::Float(mean),
        Value::Float(var.sqrt()),
        Value::Float(sorted[0]),
        Value::Float(percentile(sorted, 0.25)),
        Value::Float(percentile(sorted, 0.50)),
        Value::Float(percentile(sorted, 0.75)),
        Value::Float(sorted[sorted.len() - 1]),
    ]
}

/// Linear-interpolation percentile over an already-sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Per-column missing counts and percentages, most-missing first.
pub fn missing_summary(table: &Table) -> Table {
    let rows = table.n_rows();
    let mut entries: Vec<(String, i64, f64)> = table
        .columns()
        .iter()
        .map(|c| {
            let missing = c.values.iter().filter(|v| v.is_null()).count() as i64;
            let pct = if rows == 0 {
                0.0
            } else {
                missing as f64 / rows as f64 * 100.0
            };
            (c.name.clone(), missing, pct)
        })
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));

    Table::from_columns(vec![
        (
            "column".to_string(),
            entries.iter().map(|(n, _, _)| Value::from(n.clone())).collect(),
        ),
        (
            "missing".to_string(),
            entries.iter().map(|(_, m, _)| Value::Int(*m)).collect(),
        ),
        (
            "missing_pct".to_string(),
            entries.iter().map(|(_, _, p)| Value::Float(*p)).collect(),
        ),
    ])
    .expect("fresh columns share one length")
}

/// Count of rows that duplicate an earlier row across all columns.
pub fn duplicates_count(table: &Table) -> Table {
    let mut seen: HashSet<Vec<&Value>> = HashSet::with_capacity(table.n_rows());
    let mut duplicates = 0i64;
    for i in 0..table.n_rows() {
        if !seen.insert(table.row(i)) {
            duplicates += 1;
        }
    }
    Table::from_columns(vec![(
        "duplicate_rows".to_string(),
        vec![Value::Int(duplicates)],
    )])
    .expect("single fresh column")
}

/// Number of distinct values in one column. Nulls are excluded unless
/// `include_nulls` is set.
pub fn unique_count(
    table: &Table,
    col: &str,
    include_nulls: bool,
) -> std::result::Result<Table, TableError> {
    let column = table
        .column(col)
        .ok_or_else(|| TableError::ColumnNotFound(col.to_string()))?;
    let distinct: HashSet<&Value> = column
        .iter()
        .filter(|v| include_nulls || !v.is_null())
        .collect();
    Table::from_columns(vec![
        ("column".to_string(), vec![Value::from(col)]),
        (
            "unique_count".to_string(),
            vec![Value::Int(distinct.len() as i64)],
        ),
    ])
}

/// Top-N most frequent values in one column, nulls counted as their own
/// category. Ties break on the value itself for a deterministic order.
pub fn value_counts(
    table: &Table,
    col: &str,
    n: usize,
) -> std::result::Result<Table, TableError> {
    let column = table
        .column(col)
        .ok_or_else(|| TableError::ColumnNotFound(col.to_string()))?;
    let mut counts: BTreeMap<&Value, i64> = BTreeMap::new();
    for v in column {
        *counts.entry(v).or_insert(0) += 1;
    }
    let mut entries: Vec<(&Value, i64)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries.truncate(n);

    Table::from_columns(vec![
        (
            col.to_string(),
            entries.iter().map(|(v, _)| (*v).clone()).collect(),
        ),
        (
            "count".to_string(),
            entries.iter().map(|(_, c)| Value::Int(*c)).collect(),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_columns(vec![
            (
                "region".to_string(),
                vec![
                    Value::from("A"),
                    Value::from("A"),
                    Value::Null,
                    Value::from("B"),
                ],
            ),
            (
                "volume".to_string(),
                vec![
                    Value::Float(1.0),
                    Value::Float(2.0),
                    Value::Float(3.0),
                    Value::Float(4.0),
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_shape() {
        let out = meta_shape(&sample());
        assert_eq!(out.column("rows").unwrap()[0], Value::Int(4));
        assert_eq!(out.column("columns").unwrap()[0], Value::Int(2));
    }

    #[test]
    fn test_columns_and_dtypes() {
        let out = meta_columns(&sample());
        assert_eq!(out.n_rows(), 2);
        assert_eq!(out.column("dtype").unwrap()[1], Value::from("numeric"));
    }

    #[test]
    fn test_describe_quartiles() {
        let out = meta_describe(&sample());
        assert_eq!(out.n_rows(), 1);
        assert_eq!(out.column("count").unwrap()[0], Value::Int(4));
        assert_eq!(out.column("50%").unwrap()[0], Value::Float(2.5));
        assert_eq!(out.column("25%").unwrap()[0], Value::Float(1.75));
        assert_eq!(out.column("max").unwrap()[0], Value::Float(4.0));
    }

    #[test]
    fn test_describe_without_numeric_columns() {
        let t = Table::from_columns(vec![(
            "name".to_string(),
            vec![Value::from("x"), Value::from("y")],
        )])
        .unwrap();
        let out = meta_describe(&t);
        assert_eq!(out.column_names(), vec!["note"]);
        assert_eq!(out.n_rows(), 1);
    }

    #[test]
    fn test_missing_summary_sorted() {
        let out = missing_summary(&sample());
        // region (1 missing) sorts above volume (0 missing)
        assert_eq!(out.column("column").unwrap()[0], Value::from("region"));
        assert_eq!(out.column("missing").unwrap()[0], Value::Int(1));
        assert_eq!(out.column("missing_pct").unwrap()[0], Value::Float(25.0));
    }

    #[test]
    fn test_duplicates_count() {
        let t = Table::from_columns(vec![(
            "x".to_string(),
            vec![Value::Int(1), Value::Int(1), Value::Int(2), Value::Int(1)],
        )])
        .unwrap();
        let out = duplicates_count(&t);
        assert_eq!(out.column("duplicate_rows").unwrap()[0], Value::Int(2));
    }

    #[test]
    fn test_unique_count_excludes_nulls_by_default() {
        let t = sample();
        let out = unique_count(&t, "region", false).unwrap();
        assert_eq!(out.column("unique_count").unwrap()[0], Value::Int(2));
        let with_nulls = unique_count(&t, "region", true).unwrap();
        assert_eq!(with_nulls.column("unique_count").unwrap()[0], Value::Int(3));
    }

    #[test]
    fn test_value_counts_includes_null_category() {
        let out = value_counts(&sample(), "region", 10).unwrap();
        assert_eq!(out.n_rows(), 3);
        // A has the highest count and sorts first
        assert_eq!(out.column("region").unwrap()[0], Value::from("A"));
        assert_eq!(out.column("count").unwrap()[0], Value::Int(2));
        assert!(out.column("region").unwrap().contains(&Value::Null));
    }
}
