//! Filtered top-N sort.

use crate::error::TableError;
use crate::table::{apply_filters, FilterSpec, Table, Value};

/// Filter, sort by one or more columns, and return the first `top_n`
/// rows.
///
/// The sort is a stable composite sort; all columns share one direction.
/// Requested sort columns that do not exist are dropped; when none remain
/// the result is an unsorted head of `top_n` rows.
pub fn sort_top(
    table: &Table,
    by: &[String],
    top_n: usize,
    ascending: bool,
    filters: &FilterSpec,
) -> std::result::Result<Table, TableError> {
    let data = apply_filters(table, filters)?;
    let sort_cols: Vec<&str> = by
        .iter()
        .map(String::as_str)
        .filter(|name| data.has_column(name))
        .collect();
    if sort_cols.is_empty() {
        return Ok(data.head(top_n));
    }

    let series: Vec<&[Value]> = sort_cols
        .iter()
        .map(|name| data.column(name).expect("sort column exists"))
        .collect();

    let mut indices: Vec<usize> = (0..data.n_rows()).collect();
    indices.sort_by(|&a, &b| {
        let mut ord = std::cmp::Ordering::Equal;
        for column in &series {
            ord = column[a].cmp(&column[b]);
            if ord != std::cmp::Ordering::Equal {
                break;
            }
        }
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });
    indices.truncate(top_n);
    Ok(data.select_rows(&indices))
}
