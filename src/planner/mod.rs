//! Intent planner.
//!
//! Maps a free-text question plus the available column names to a typed
//! [`Plan`]. Purely textual pattern matching: no external calls, no
//! randomness, deterministic for identical input. Rules are tested in a
//! fixed priority order and the first match wins; failing to resolve a
//! column degrades the plan (a parameter is dropped or a later rule
//! fires) instead of erroring, so the session never blocks on ambiguous
//! phrasing.

pub mod resolve;
pub mod types;

pub use resolve::{first_present, resolve_column};
pub use types::Plan;

use std::sync::LazyLock;

use regex::Regex;

use crate::ops::{row_count_ops, AggFunc, AggMap};
use crate::table::{ColumnFilter, FilterSpec, PredicateSet, Value};

// ============================================================================
// Phrase tables
// ============================================================================

const SHAPE_PHRASES: &[&str] = &[
    "how many columns",
    "number of columns",
    "columns count",
    "col count",
    "dataset shape",
    "shape",
    "dimensions",
];
const COLUMN_PHRASES: &[&str] = &[
    "list columns",
    "what are the columns",
    "show columns",
    "column names",
    "headers",
    "features",
    "schema",
];
const DTYPE_PHRASES: &[&str] = &["dtypes", "data types", "types of columns", "show dtypes"];
const DESCRIBE_PHRASES: &[&str] = &["describe", "summary stats", "summary statistics", "stats"];
const MISSING_PHRASES: &[&str] = &["missing values", "nulls", "nans", "na values", "na summary"];
const DUPLICATE_PHRASES: &[&str] = &["duplicate rows", "duplicates"];
const VALUE_COUNT_PHRASES: &[&str] = &["value counts", "frequency", "distribution", "breakdown"];
const ROW_COUNT_PHRASES: &[&str] = &["how many rows", "count rows", "row count", "number of rows"];

/// Numeric target guesses for sum/total questions.
const SUM_PREFERENCE: &[&str] = &["scheduled_quantity", "shipments", "volume", "amount", "value"];
/// Mean questions add delay-style columns to the guess list.
const MEAN_PREFERENCE: &[&str] = &[
    "scheduled_quantity",
    "shipments",
    "volume",
    "delay_hours",
    "amount",
    "value",
];
const TREND_PREFERENCE: &[&str] = &["scheduled_quantity", "shipments", "volume", "delay_hours"];
const OUTLIER_PREFERENCE: &[&str] = &["scheduled_quantity", "delay_hours", "volume", "shipments"];
const CORRELATION_CANDIDATES: &[&str] = &[
    "scheduled_quantity",
    "shipments",
    "volume",
    "delay_hours",
    "rec_del_sign",
];

// ============================================================================
// Extraction patterns
// ============================================================================

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").expect("Invalid regex"));
static INT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,4})\b").expect("Invalid regex"));
static TOP_N_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:top|largest)\s+(\d+)\s+rows?\s+by\s+([a-z0-9_ ]+)").expect("Invalid regex")
});
static BY_PER_TAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?: by | per )([a-z0-9_ ]+)$").expect("Invalid regex"));
static BY_ANY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"by ([a-z0-9_ ]+)").expect("Invalid regex"));
static WHERE_EQ_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"where\s+([a-z0-9_ ]+)\s*=\s*([a-z0-9_/\-]+)").expect("Invalid regex")
});
static WHERE_CONTAINS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"where\s+([a-z0-9_ ]+)\s+contains\s+([a-z0-9_/\-]+)").expect("Invalid regex")
});

// ============================================================================
// Planner
// ============================================================================

/// Translate a natural-language question into a structured plan.
pub fn plan_from_nl(question: &str, available_cols: &[String]) -> Plan {
    let q = question.trim().to_lowercase();

    let n = extract_int(&q);
    let year = extract_year(&q);
    let mut filters = extract_filters(&q, available_cols);

    // Metadata / schema questions
    if contains_any(&q, SHAPE_PHRASES) {
        return Plan::MetaShape;
    }
    if contains_any(&q, COLUMN_PHRASES) {
        return Plan::MetaColumns;
    }
    if contains_any(&q, DTYPE_PHRASES) {
        return Plan::MetaDtypes;
    }
    if contains_any(&q, DESCRIBE_PHRASES) {
        return Plan::MetaDescribe;
    }
    if q.contains("head") || q.contains("first rows") || q.contains("show first") {
        return Plan::MetaHead { n: n.unwrap_or(5) };
    }
    if q.contains("tail") || q.contains("last rows") || q.contains("show last") {
        return Plan::MetaTail { n: n.unwrap_or(5) };
    }
    if contains_any(&q, MISSING_PHRASES) {
        return Plan::MetaMissing;
    }
    if contains_any(&q, DUPLICATE_PHRASES) {
        return Plan::MetaDuplicates;
    }

    // Uniqueness and frequency
    if q.contains("unique") || q.contains("distinct") {
        if let Some(col) = resolve_column(&q, available_cols) {
            return Plan::UniqueCount { col };
        }
    }
    if contains_any(&q, VALUE_COUNT_PHRASES) {
        if let Some(col) = resolve_column(&q, available_cols) {
            return Plan::ValueCounts {
                col,
                n: n.unwrap_or(10),
            };
        }
    }

    // Row counts, grouped or filtered ("count rows by year", "rows in 2024")
    if contains_any(&q, ROW_COUNT_PHRASES) {
        if let Some(group) = resolve_col_after_by_or_per(&q, available_cols) {
            return Plan::GroupCount {
                group_by: vec![group],
            };
        }
        let mut f = filters.clone();
        fold_year_filter(&mut f, year, available_cols);
        return Plan::Aggregate {
            group_by: vec![],
            ops: row_count_ops(),
            filters: f,
        };
    }

    // "top 10 rows by scheduled_quantity where state_abb = tx"
    if let Some(caps) = TOP_N_RE.captures(&q) {
        let top_n: usize = caps[1].parse().unwrap_or(10);
        if let Some(by_col) = resolve_column(&caps[2], available_cols) {
            return Plan::SortTop {
                by: vec![by_col],
                ascending: false,
                top_n,
                filters,
            };
        }
    }

    // Sum / total
    if q.contains("sum") || q.contains("total") {
        let target = first_present(SUM_PREFERENCE, available_cols);
        let group_by = resolve_group_by(&q, year, available_cols);
        fold_year_filter(&mut filters, year, available_cols);
        return Plan::Aggregate {
            group_by,
            ops: single_op(target, AggFunc::Sum),
            filters,
        };
    }

    // Average / mean
    if q.contains("average") || q.contains("mean") || q.contains("avg") {
        let target = resolve_column(&q, available_cols)
            .or_else(|| first_present(MEAN_PREFERENCE, available_cols));
        let group_by = resolve_group_by(&q, year, available_cols);
        fold_year_filter(&mut filters, year, available_cols);
        return Plan::Aggregate {
            group_by,
            ops: single_op(target, AggFunc::Mean),
            filters,
        };
    }

    // Correlation
    if q.contains("correlation")
        || q.contains("correlate")
        || q.contains("relationship")
        || q.contains("corr")
    {
        let cols: Vec<String> = CORRELATION_CANDIDATES
            .iter()
            .filter(|c| available_cols.iter().any(|a| a == *c))
            .map(|c| c.to_string())
            .collect();
        return Plan::Correlation { cols };
    }

    // Outliers
    if q.contains("outlier") || q.contains("anomaly") || q.contains("weird") {
        let col = resolve_column(&q, available_cols)
            .or_else(|| first_present(OUTLIER_PREFERENCE, available_cols))
            .or_else(|| available_cols.first().cloned());
        return Plan::ZscoreOutliers {
            col,
            threshold: 3.0,
        };
    }

    // Trend phrasing
    if q.contains("trend") || q.contains("over time") || q.contains("by year") {
        let target = resolve_column(&q, available_cols)
            .or_else(|| first_present(TREND_PREFERENCE, available_cols));
        let group_by = if has_column(available_cols, "year") {
            vec!["year".to_string()]
        } else {
            vec![]
        };
        return Plan::Aggregate {
            group_by,
            ops: single_op(target, AggFunc::Mean),
            filters: FilterSpec::new(),
        };
    }

    // Default: unfiltered row count
    Plan::Aggregate {
        group_by: vec![],
        ops: row_count_ops(),
        filters: FilterSpec::new(),
    }
}

// ============================================================================
// Signal extraction
// ============================================================================

fn contains_any(q: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| q.contains(p))
}

fn has_column(columns: &[String], name: &str) -> bool {
    columns.iter().any(|c| c == name)
}

/// First 20xx token anywhere in the text.
fn extract_year(text: &str) -> Option<i64> {
    YEAR_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// First small integer token, used as a row limit.
fn extract_int(text: &str) -> Option<usize> {
    INT_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// Fold an extracted year into an equality filter on a `year` column, if
/// the dataset has one.
fn fold_year_filter(filters: &mut FilterSpec, year: Option<i64>, columns: &[String]) {
    if let Some(year) = year {
        if has_column(columns, "year") {
            filters.insert("year".to_string(), ColumnFilter::Equals(Value::Int(year)));
        }
    }
}

/// Group-by resolution shared by the sum/average rules: an explicit
/// "by/per <column>" suffix wins; otherwise an implicit year grouping
/// applies when a `year` column exists and the question mentions one.
fn resolve_group_by(q: &str, year: Option<i64>, columns: &[String]) -> Vec<String> {
    if let Some(group) = resolve_col_after_by_or_per(q, columns) {
        return vec![group];
    }
    if has_column(columns, "year") && (q.contains("by year") || year.is_some()) {
        return vec!["year".to_string()];
    }
    vec![]
}

/// Resolve the column named by a trailing "by <x>"/"per <x>" phrase, with
/// a relaxed anywhere-in-text fallback.
fn resolve_col_after_by_or_per(q: &str, columns: &[String]) -> Option<String> {
    let caps = BY_PER_TAIL_RE.captures(q).or_else(|| BY_ANY_RE.captures(q))?;
    resolve_column(&caps[1], columns)
}

/// Extract an equality or contains filter from a `where <col> = <val>` /
/// `where <col> contains <val>` sub-phrase. Unresolvable columns leave no
/// filter behind.
fn extract_filters(q: &str, columns: &[String]) -> FilterSpec {
    let mut filters = FilterSpec::new();
    if let Some(caps) = WHERE_EQ_RE.captures(q) {
        if let Some(col) = resolve_column(&caps[1], columns) {
            filters.insert(col, ColumnFilter::Equals(coerce_literal(caps[2].trim())));
        }
    }
    if let Some(caps) = WHERE_CONTAINS_RE.captures(q) {
        if let Some(col) = resolve_column(&caps[1], columns) {
            filters.insert(
                col,
                ColumnFilter::Where(PredicateSet::contains(caps[2].trim())),
            );
        }
    }
    filters
}

/// Parse a filter literal: integer, then float, then string. Short
/// strings are uppercased to match code-style columns (state
/// abbreviations, status codes).
fn coerce_literal(s: &str) -> Value {
    if let Ok(v) = s.parse::<i64>() {
        return Value::Int(v);
    }
    if let Ok(v) = s.parse::<f64>() {
        return Value::Float(v);
    }
    if s.len() <= 5 {
        Value::Str(s.to_uppercase())
    } else {
        Value::Str(s.to_string())
    }
}

fn single_op(target: Option<String>, func: AggFunc) -> AggMap {
    let mut ops = AggMap::new();
    if let Some(target) = target {
        ops.insert(target, func);
    }
    ops
}
