//! tabula: interactive natural-language query agent over one tabular
//! dataset.
//!
//! A loaded dataset is queried with free-text questions. Each question is
//! mapped by a rule-based planner to a typed analytical plan, executed
//! against an in-memory column table, and rendered with an evidence trail
//! (plan, method, preview). An optional add-on asks a language model for
//! caveated commentary on analytical results.

pub mod answer;
pub mod config;
pub mod dataset;
pub mod error;
pub mod executor;
pub mod insight;
pub mod ops;
pub mod planner;
pub mod session;
pub mod table;

pub use answer::{format_answer, format_failure};
pub use config::Config;
pub use dataset::{
    clean_table, derive_year, extract_drive_file_id, infer_schema, load_table, LoadOptions,
    SourceFormat,
};
pub use error::{DatasetError, InsightError, Result, TableError, TabulaError};
pub use executor::execute;
pub use insight::{AnthropicProvider, InsightGenerator, InsightProvider, OpenAiProvider};
pub use ops::{AggFunc, AggMap, WILDCARD};
pub use planner::{first_present, plan_from_nl, resolve_column, Plan};
pub use session::Session;
pub use table::{
    apply_filters, ColumnFilter, DataType, FilterSpec, PredicateSet, Schema, Table, Value,
};
