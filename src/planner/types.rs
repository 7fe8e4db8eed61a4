//! Typed query plans.
//!
//! A plan is the structured representation of a user's analytical intent:
//! one closed set of plan kinds with typed parameters. The executor
//! matches exhaustively over this union, so adding a kind is a
//! compile-time checked change.

use serde::{Deserialize, Serialize};

use crate::ops::AggMap;
use crate::table::FilterSpec;

/// Structured analytical intent produced by the planner and consumed by
/// the executor. Serialized plans use the stable wire discriminants
/// (`meta:shape`, `aggregate`, `anomaly:zscore`, ...), which is also how
/// plans appear in the answer's evidence block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Plan {
    #[serde(rename = "meta:shape")]
    MetaShape,
    #[serde(rename = "meta:columns")]
    MetaColumns,
    #[serde(rename = "meta:dtypes")]
    MetaDtypes,
    #[serde(rename = "meta:describe")]
    MetaDescribe,
    #[serde(rename = "meta:head")]
    MetaHead { n: usize },
    #[serde(rename = "meta:tail")]
    MetaTail { n: usize },
    #[serde(rename = "meta:missing")]
    MetaMissing,
    #[serde(rename = "meta:duplicates")]
    MetaDuplicates,
    #[serde(rename = "unique_count")]
    UniqueCount { col: String },
    #[serde(rename = "value_counts")]
    ValueCounts { col: String, n: usize },
    #[serde(rename = "group_count")]
    GroupCount { group_by: Vec<String> },
    #[serde(rename = "aggregate")]
    Aggregate {
        group_by: Vec<String>,
        ops: AggMap,
        filters: FilterSpec,
    },
    #[serde(rename = "correlation")]
    Correlation { cols: Vec<String> },
    #[serde(rename = "sort_top")]
    SortTop {
        by: Vec<String>,
        ascending: bool,
        top_n: usize,
        filters: FilterSpec,
    },
    #[serde(rename = "anomaly:zscore")]
    ZscoreOutliers { col: Option<String>, threshold: f64 },
    #[serde(rename = "anomaly:iforest")]
    IforestOutliers { cols: Vec<String>, contamination: f64 },
}

impl Plan {
    /// Wire discriminant of this plan kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MetaShape => "meta:shape",
            Self::MetaColumns => "meta:columns",
            Self::MetaDtypes => "meta:dtypes",
            Self::MetaDescribe => "meta:describe",
            Self::MetaHead { .. } => "meta:head",
            Self::MetaTail { .. } => "meta:tail",
            Self::MetaMissing => "meta:missing",
            Self::MetaDuplicates => "meta:duplicates",
            Self::UniqueCount { .. } => "unique_count",
            Self::ValueCounts { .. } => "value_counts",
            Self::GroupCount { .. } => "group_count",
            Self::Aggregate { .. } => "aggregate",
            Self::Correlation { .. } => "correlation",
            Self::SortTop { .. } => "sort_top",
            Self::ZscoreOutliers { .. } => "anomaly:zscore",
            Self::IforestOutliers { .. } => "anomaly:iforest",
        }
    }
}
