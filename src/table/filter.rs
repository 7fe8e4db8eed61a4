//! Filter engine.
//!
//! Applies a declarative per-column filter specification to a table,
//! producing a filtered copy. Keys are combined conjunctively, and so are
//! the predicate kinds inside one entry. Keys naming unknown columns are
//! skipped, never an error: the planner resolves column names best-effort
//! and the filter engine honors the same lenient policy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::value::Value;
use super::Table;
use crate::error::TableError;

/// Declarative row-filtering specification keyed by column name.
pub type FilterSpec = BTreeMap<String, ColumnFilter>;

/// Filter for a single column: either a bare literal (equality) or a set
/// of predicates applied conjunctively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnFilter {
    Equals(Value),
    Where(PredicateSet),
}

/// Predicate descriptor for one column. All present predicates must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredicateSet {
    /// Inclusive lower/upper bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub between: Option<(Value, Value)>,
    /// Set membership.
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub is_in: Option<Vec<Value>>,
    /// Case-insensitive substring match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    /// Case-insensitive prefix match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub startswith: Option<String>,
    /// Case-insensitive suffix match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endswith: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
}

impl PredicateSet {
    pub fn contains(value: impl Into<String>) -> Self {
        Self {
            contains: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn between(lo: impl Into<Value>, hi: impl Into<Value>) -> Self {
        Self {
            between: Some((lo.into(), hi.into())),
            ..Self::default()
        }
    }
}

/// Apply a filter specification, returning a filtered copy of the table.
///
/// An empty spec returns a full copy: callers are free to mutate the
/// result without touching the input. Ordering predicates (`between`,
/// `gt`, `gte`, `lt`, `lte`) are numeric-only; applying one to a
/// non-numeric column is a typed error rather than a silent no-match.
pub fn apply_filters(
    table: &Table,
    filters: &FilterSpec,
) -> std::result::Result<Table, TableError> {
    if filters.is_empty() {
        return Ok(table.clone());
    }

    let mut keep = vec![true; table.n_rows()];
    for (name, filter) in filters {
        let Some(column) = table.column(name) else {
            continue;
        };
        match filter {
            ColumnFilter::Equals(target) => {
                for (i, cell) in column.iter().enumerate() {
                    if keep[i] && !cell.filter_eq(target) {
                        keep[i] = false;
                    }
                }
            }
            ColumnFilter::Where(preds) => {
                apply_predicates(name, column, preds, &mut keep)?;
            }
        }
    }

    let indices: Vec<usize> = keep
        .iter()
        .enumerate()
        .filter(|(_, k)| **k)
        .map(|(i, _)| i)
        .collect();
    Ok(table.select_rows(&indices))
}

fn apply_predicates(
    name: &str,
    column: &[Value],
    preds: &PredicateSet,
    keep: &mut [bool],
) -> std::result::Result<(), TableError> {
    if let Some((lo, hi)) = &preds.between {
        let lo = require_numeric(name, lo)?;
        let hi = require_numeric(name, hi)?;
        ordering_filter(name, column, keep, |x| x >= lo && x <= hi)?;
    }
    if let Some(allowed) = &preds.is_in {
        for (i, cell) in column.iter().enumerate() {
            if keep[i] && !allowed.iter().any(|v| cell.filter_eq(v)) {
                keep[i] = false;
            }
        }
    }
    if let Some(needle) = &preds.contains {
        text_filter(column, keep, |text| {
            text.to_lowercase().contains(&needle.to_lowercase())
        });
    }
    if let Some(prefix) = &preds.startswith {
        text_filter(column, keep, |text| {
            text.to_lowercase().starts_with(&prefix.to_lowercase())
        });
    }
    if let Some(suffix) = &preds.endswith {
        text_filter(column, keep, |text| {
            text.to_lowercase().ends_with(&suffix.to_lowercase())
        });
    }
    if let Some(bound) = &preds.gt {
        let b = require_numeric(name, bound)?;
        ordering_filter(name, column, keep, |x| x > b)?;
    }
    if let Some(bound) = &preds.gte {
        let b = require_numeric(name, bound)?;
        ordering_filter(name, column, keep, |x| x >= b)?;
    }
    if let Some(bound) = &preds.lt {
        let b = require_numeric(name, bound)?;
        ordering_filter(name, column, keep, |x| x < b)?;
    }
    if let Some(bound) = &preds.lte {
        let b = require_numeric(name, bound)?;
        ordering_filter(name, column, keep, |x| x <= b)?;
    }
    Ok(())
}

fn require_numeric(column: &str, value: &Value) -> std::result::Result<f64, TableError> {
    value.as_f64().ok_or_else(|| TableError::NonNumericComparison {
        column: column.to_string(),
    })
}

/// Narrow `keep` with a numeric predicate. Null cells never match; a
/// non-null non-numeric cell makes the comparison an error.
fn ordering_filter(
    name: &str,
    column: &[Value],
    keep: &mut [bool],
    pred: impl Fn(f64) -> bool,
) -> std::result::Result<(), TableError> {
    for (i, cell) in column.iter().enumerate() {
        if !keep[i] {
            continue;
        }
        match cell {
            Value::Null => keep[i] = false,
            other => match other.as_f64() {
                Some(x) => {
                    if !pred(x) {
                        keep[i] = false;
                    }
                }
                None => {
                    return Err(TableError::NonNumericComparison {
                        column: name.to_string(),
                    })
                }
            },
        }
    }
    Ok(())
}

fn text_filter(column: &[Value], keep: &mut [bool], pred: impl Fn(&str) -> bool) {
    for (i, cell) in column.iter().enumerate() {
        if !keep[i] {
            continue;
        }
        match cell.as_text() {
            Some(text) if pred(&text) => {}
            _ => keep[i] = false,
        }
    }
}
