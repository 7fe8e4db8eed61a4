//! Plan executor.
//!
//! Dispatches a structured plan to the matching analytical operation. The
//! match over [`Plan`] is exhaustive, so every plan kind the planner can
//! produce is guaranteed handled at compile time.

use crate::error::TableError;
use crate::ops::{
    aggregate, correlations, duplicates_count, group_count, iforest_outliers, is_row_count_only,
    meta_columns, meta_describe, meta_head, meta_shape, meta_tail, missing_summary, sort_top,
    unique_count, value_counts, zscore_outliers,
};
use crate::planner::Plan;
use crate::table::{apply_filters, Table, Value};

/// Default column count for isolation-forest anomaly detection when the
/// plan does not name candidates.
const IFOREST_DEFAULT_COLS: usize = 4;

/// Execute a plan against the loaded table, returning the result and a
/// human-readable description of the method used.
pub fn execute(table: &Table, plan: &Plan) -> std::result::Result<(Table, String), TableError> {
    match plan {
        Plan::MetaShape => Ok((meta_shape(table), "Dataset shape".to_string())),
        Plan::MetaColumns => Ok((meta_columns(table), "Columns and dtypes".to_string())),
        Plan::MetaDtypes => Ok((meta_columns(table), "Data types".to_string())),
        Plan::MetaDescribe => Ok((
            meta_describe(table),
            "Numeric summary statistics".to_string(),
        )),
        Plan::MetaHead { n } => Ok((meta_head(table, *n), format!("Head (first {n} rows)"))),
        Plan::MetaTail { n } => Ok((meta_tail(table, *n), format!("Tail (last {n} rows)"))),
        Plan::MetaMissing => Ok((
            missing_summary(table),
            "Missing values by column".to_string(),
        )),
        Plan::MetaDuplicates => Ok((duplicates_count(table), "Duplicate rows count".to_string())),

        Plan::UniqueCount { col } => Ok((
            unique_count(table, col, false)?,
            format!("Unique count of {col}"),
        )),
        Plan::ValueCounts { col, n } => Ok((
            value_counts(table, col, *n)?,
            format!("Value counts for {col} (top {n})"),
        )),

        Plan::GroupCount { group_by } => Ok((
            group_count(table, group_by),
            format!("Row counts by {}", group_by.join(", ")),
        )),

        Plan::Aggregate {
            group_by,
            ops,
            filters,
        } => {
            // A pure row count per group is just a group count.
            if is_row_count_only(ops) && !group_by.is_empty() {
                return Ok((
                    group_count(table, group_by),
                    format!("Row counts by {}", group_by.join(", ")),
                ));
            }
            // A pure row count without grouping short-circuits to a
            // filtered length.
            if is_row_count_only(ops) {
                let data = apply_filters(table, filters)?;
                let result = Table::from_columns(vec![(
                    "row_count".to_string(),
                    vec![Value::Int(data.n_rows() as i64)],
                )])?;
                return Ok((result, "Row count with optional filters".to_string()));
            }
            Ok((
                aggregate(table, group_by, ops, filters)?,
                "Aggregate with group_by/filters".to_string(),
            ))
        }

        Plan::Correlation { cols } => Ok((
            correlations(table, cols),
            "Pairwise Pearson correlations".to_string(),
        )),

        Plan::SortTop {
            by,
            ascending,
            top_n,
            filters,
        } => Ok((
            sort_top(table, by, *top_n, *ascending, filters)?,
            format!("Sorted by {by:?} (ascending={ascending}) top {top_n}"),
        )),

        Plan::ZscoreOutliers { col, threshold } => {
            let resolved = col
                .as_ref()
                .filter(|c| table.has_column(c))
                .cloned()
                .or_else(|| table.numeric_columns().into_iter().next());
            match resolved {
                Some(col) => Ok((
                    zscore_outliers(table, &col, *threshold)?,
                    format!("Z-score outliers on {col} (|z| >= {threshold})"),
                )),
                None => Ok((
                    note_table("No numeric columns for outlier detection."),
                    "Z-score outliers (no numeric column)".to_string(),
                )),
            }
        }

        Plan::IforestOutliers {
            cols,
            contamination,
        } => {
            let cols: Vec<String> = if cols.is_empty() {
                table
                    .numeric_columns()
                    .into_iter()
                    .take(IFOREST_DEFAULT_COLS)
                    .collect()
            } else {
                cols.clone()
            };
            Ok((
                iforest_outliers(table, &cols, *contamination),
                format!("IsolationForest anomalies on {cols:?} (contamination={contamination})"),
            ))
        }
    }
}

fn note_table(message: &str) -> Table {
    Table::from_columns(vec![("note".to_string(), vec![Value::from(message)])])
        .expect("single fresh column")
}
