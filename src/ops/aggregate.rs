//! Grouped and ungrouped aggregation, plus per-group row counts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TableError;
use crate::table::{apply_filters, FilterSpec, Table, Value};

/// Ops-map key requesting a plain row count over the whole selection.
pub const WILDCARD: &str = "*";

/// Aggregation kind for one target column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    Count,
    Sum,
    Mean,
    Min,
    Max,
    Median,
    Std,
}

/// Mapping from column name (or the `*` wildcard) to aggregation kind.
pub type AggMap = BTreeMap<String, AggFunc>;

/// Ops map holding exactly a wildcard row count, the shape the planner
/// emits for plain "how many rows" questions.
pub fn row_count_ops() -> AggMap {
    let mut ops = AggMap::new();
    ops.insert(WILDCARD.to_string(), AggFunc::Count);
    ops
}

/// True when the ops map is exactly `{*: count}`.
pub fn is_row_count_only(ops: &AggMap) -> bool {
    ops.len() == 1 && ops.get(WILDCARD) == Some(&AggFunc::Count)
}

/// Filter, then aggregate.
///
/// With group-by columns, produces one row per distinct combination of
/// group keys (null is a valid key, not dropped), ordered by key. A
/// wildcard row count is computed from group sizes and joined onto the
/// value aggregates with every group preserved, so a group whose target
/// column is all-null still appears, with a null aggregate.
///
/// With an empty ops map the filtered table is returned unchanged; group
/// and target columns that do not exist are skipped.
pub fn aggregate(
    table: &Table,
    group_by: &[String],
    ops: &AggMap,
    filters: &FilterSpec,
) -> std::result::Result<Table, TableError> {
    let data = apply_filters(table, filters)?;
    if ops.is_empty() {
        return Ok(data);
    }

    let want_row_count = ops.get(WILDCARD) == Some(&AggFunc::Count);
    let targets: Vec<(&str, AggFunc)> = ops
        .iter()
        .filter(|(name, _)| name.as_str() != WILDCARD && data.has_column(name))
        .map(|(name, func)| (name.as_str(), *func))
        .collect();

    let group_cols: Vec<&str> = group_by
        .iter()
        .map(String::as_str)
        .filter(|name| data.has_column(name))
        .collect();

    if group_cols.is_empty() {
        return ungrouped(&data, want_row_count, &targets);
    }

    // Partition rows by group key; BTreeMap gives deterministic key order.
    let mut groups: BTreeMap<Vec<Value>, Vec<usize>> = BTreeMap::new();
    for i in 0..data.n_rows() {
        let key: Vec<Value> = group_cols
            .iter()
            .map(|name| data.column(name).expect("group column exists")[i].clone())
            .collect();
        groups.entry(key).or_default().push(i);
    }

    let mut columns: Vec<(String, Vec<Value>)> = group_cols
        .iter()
        .map(|name| (name.to_string(), Vec::with_capacity(groups.len())))
        .collect();
    if want_row_count {
        columns.push(("row_count".to_string(), Vec::with_capacity(groups.len())));
    }
    for (name, _) in &targets {
        columns.push((name.to_string(), Vec::with_capacity(groups.len())));
    }

    for (key, rows) in &groups {
        let mut slot = 0;
        for cell in key {
            columns[slot].1.push(cell.clone());
            slot += 1;
        }
        if want_row_count {
            columns[slot].1.push(Value::Int(rows.len() as i64));
            slot += 1;
        }
        for (name, func) in &targets {
            let column = data.column(name).expect("target column exists");
            let cells: Vec<&Value> = rows.iter().map(|&i| &column[i]).collect();
            columns[slot].1.push(apply_func(*func, &cells));
            slot += 1;
        }
    }

    Table::from_columns(columns)
}

fn ungrouped(
    data: &Table,
    want_row_count: bool,
    targets: &[(&str, AggFunc)],
) -> std::result::Result<Table, TableError> {
    let mut columns: Vec<(String, Vec<Value>)> = Vec::new();
    if want_row_count {
        columns.push((
            "row_count".to_string(),
            vec![Value::Int(data.n_rows() as i64)],
        ));
    }
    for (name, func) in targets {
        let column = data.column(name).expect("target column exists");
        let cells: Vec<&Value> = column.iter().collect();
        columns.push((name.to_string(), vec![apply_func(*func, &cells)]));
    }
    Table::from_columns(columns)
}

/// Row counts per distinct combination of the given columns, null keys
/// included. Missing group columns are dropped; with none left the result
/// is a single total row count.
pub fn group_count(table: &Table, group_by: &[String]) -> Table {
    let group_cols: Vec<&str> = group_by
        .iter()
        .map(String::as_str)
        .filter(|name| table.has_column(name))
        .collect();
    if group_cols.is_empty() {
        return Table::from_columns(vec![(
            "row_count".to_string(),
            vec![Value::Int(table.n_rows() as i64)],
        )])
        .expect("single fresh column");
    }

    let mut groups: BTreeMap<Vec<Value>, i64> = BTreeMap::new();
    for i in 0..table.n_rows() {
        let key: Vec<Value> = group_cols
            .iter()
            .map(|name| table.column(name).expect("group column exists")[i].clone())
            .collect();
        *groups.entry(key).or_insert(0) += 1;
    }

    let mut columns: Vec<(String, Vec<Value>)> = group_cols
        .iter()
        .map(|name| (name.to_string(), Vec::with_capacity(groups.len())))
        .collect();
    columns.push(("row_count".to_string(), Vec::with_capacity(groups.len())));
    for (key, count) in &groups {
        for (slot, cell) in key.iter().enumerate() {
            columns[slot].1.push(cell.clone());
        }
        columns[group_cols.len()].1.push(Value::Int(*count));
    }
    Table::from_columns(columns).expect("fresh columns share one length")
}

/// Evaluate one aggregation over the cells of a group. Nulls are skipped;
/// an empty (all-null) input yields null. `std` is the population
/// standard deviation, matching the z-score detector.
fn apply_func(func: AggFunc, cells: &[&Value]) -> Value {
    let present: Vec<&Value> = cells.iter().copied().filter(|v| !v.is_null()).collect();
    match func {
        AggFunc::Count => Value::Int(present.len() as i64),
        AggFunc::Min => present.iter().min().map(|v| (*v).clone()).unwrap_or(Value::Null),
        AggFunc::Max => present.iter().max().map(|v| (*v).clone()).unwrap_or(Value::Null),
        AggFunc::Sum => {
            let nums = numeric(&present);
            if nums.is_empty() {
                return Value::Null;
            }
            let total: f64 = nums.iter().sum();
            if present.iter().all(|v| matches!(v, Value::Int(_))) {
                Value::Int(total as i64)
            } else {
                Value::Float(total)
            }
        }
        AggFunc::Mean => {
            let nums = numeric(&present);
            if nums.is_empty() {
                Value::Null
            } else {
                Value::Float(nums.iter().sum::<f64>() / nums.len() as f64)
            }
        }
        AggFunc::Median => {
            let mut nums = numeric(&present);
            if nums.is_empty() {
                return Value::Null;
            }
            nums.sort_by(f64::total_cmp);
            let mid = nums.len() / 2;
            if nums.len() % 2 == 1 {
                Value::Float(nums[mid])
            } else {
                Value::Float((nums[mid - 1] + nums[mid]) / 2.0)
            }
        }
        AggFunc::Std => {
            let nums = numeric(&present);
            if nums.is_empty() {
                return Value::Null;
            }
            let mean = nums.iter().sum::<f64>() / nums.len() as f64;
            let var = nums.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / nums.len() as f64;
            Value::Float(var.sqrt())
        }
    }
}

fn numeric(cells: &[&Value]) -> Vec<f64> {
    cells.iter().filter_map(|v| v.as_f64()).collect()
}
