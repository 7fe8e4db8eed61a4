//! Schema inference, column coercion, and year derivation.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::table::{DataType, Schema, Table, Value};

/// Column-name fragments that suggest a date column, checked in order.
const DATE_NAME_HINTS: &[&str] = &["date", "day", "gas_day", "eff_gas_day", "timestamp"];

/// Datetime layouts accepted during inference and coercion.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];

/// Infer a broad type per column: numeric when every non-null cell reads
/// as a number, else datetime when every non-null cell parses as a date,
/// else categorical.
pub fn infer_schema(table: &Table) -> Schema {
    let entries = table
        .columns()
        .iter()
        .map(|c| (c.name.clone(), infer_column(&c.values)))
        .collect();
    Schema::new(entries)
}

fn infer_column(values: &[Value]) -> DataType {
    let present: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
    if present.is_empty() {
        return DataType::Categorical;
    }
    if present.iter().all(|v| cell_as_number(v).is_some()) {
        return DataType::Numeric;
    }
    if present.iter().all(|v| cell_as_datetime(v).is_some()) {
        return DataType::Datetime;
    }
    DataType::Categorical
}

/// Coerce every column to its inferred type, turning unparseable cells
/// into nulls. Consumes and returns the table; the caller's copy is the
/// result.
pub fn clean_table(table: Table, schema: &Schema) -> Table {
    let columns = table
        .columns()
        .iter()
        .map(|c| {
            let values = match schema.get(&c.name) {
                Some(DataType::Numeric) => c.values.iter().map(coerce_numeric).collect(),
                Some(DataType::Datetime) => c.values.iter().map(coerce_datetime).collect(),
                _ => c.values.clone(),
            };
            (c.name.clone(), values)
        })
        .collect();
    Table::from_columns(columns).expect("coercion preserves shape")
}

fn coerce_numeric(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => value.clone(),
        Value::Str(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .map(Value::Int)
                .or_else(|_| trimmed.parse::<f64>().map(Value::Float))
                .unwrap_or(Value::Null)
        }
        Value::DateTime(_) => Value::Null,
    }
}

fn coerce_datetime(value: &Value) -> Value {
    match cell_as_datetime(value) {
        Some(dt) => Value::DateTime(dt),
        None => Value::Null,
    }
}

fn cell_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Str(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    }
}

fn cell_as_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::Str(s) => parse_datetime(s.trim()),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.and_hms_opt(0, 0, 0).expect("midnight is valid"));
        }
    }
    None
}

/// Derive an integer `year` column from the configured date column, a
/// name-based guess, or the first inferred-datetime column. Does nothing
/// when no candidate is found.
pub fn derive_year(table: &mut Table, schema: &Schema, date_col: Option<&str>) {
    let candidate = match date_col {
        Some(name) if table.has_column(name) => Some(name.to_string()),
        _ => name_hint_column(table).or_else(|| {
            schema
                .iter()
                .find(|(_, t)| *t == DataType::Datetime)
                .map(|(name, _)| name.to_string())
        }),
    };
    let Some(candidate) = candidate else {
        return;
    };
    let Some(column) = table.column(&candidate) else {
        return;
    };

    let years: Vec<Value> = column
        .iter()
        .map(|cell| match cell_as_datetime(cell) {
            Some(dt) => Value::Int(dt.year() as i64),
            None => Value::Null,
        })
        .collect();
    debug!(column = %candidate, "derived year column");
    table
        .insert_column("year", years)
        .expect("year column matches row count");
}

fn name_hint_column(table: &Table) -> Option<String> {
    table.column_names().iter().find_map(|name| {
        let lower = name.to_lowercase();
        DATE_NAME_HINTS
            .iter()
            .any(|hint| lower.contains(hint))
            .then(|| name.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> Table {
        Table::from_columns(vec![
            (
                "eff_gas_day".to_string(),
                vec![
                    Value::from("2023-01-15"),
                    Value::from("2024-06-02"),
                    Value::from("not a date"),
                ],
            ),
            (
                "volume".to_string(),
                vec![Value::from("10"), Value::from("2.5"), Value::from("")],
            ),
            (
                "state".to_string(),
                vec![Value::from("TX"), Value::from("LA"), Value::from("OK")],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_infer_schema_mixed() {
        // the date column has an unparseable cell, so it stays categorical
        let t = raw();
        let schema = infer_schema(&t);
        assert_eq!(schema.get("eff_gas_day"), Some(DataType::Categorical));
        assert_eq!(schema.get("state"), Some(DataType::Categorical));
    }

    #[test]
    fn test_infer_and_clean_numeric() {
        let t = Table::from_columns(vec![(
            "volume".to_string(),
            vec![Value::from("10"), Value::from("2.5"), Value::Null],
        )])
        .unwrap();
        let schema = infer_schema(&t);
        assert_eq!(schema.get("volume"), Some(DataType::Numeric));
        let cleaned = clean_table(t, &schema);
        let col = cleaned.column("volume").unwrap();
        assert_eq!(col[0], Value::Int(10));
        assert_eq!(col[1], Value::Float(2.5));
        assert_eq!(col[2], Value::Null);
    }

    #[test]
    fn test_infer_and_clean_datetime() {
        let t = Table::from_columns(vec![(
            "day".to_string(),
            vec![Value::from("2023-01-15"), Value::Null],
        )])
        .unwrap();
        let schema = infer_schema(&t);
        assert_eq!(schema.get("day"), Some(DataType::Datetime));
        let cleaned = clean_table(t, &schema);
        match &cleaned.column("day").unwrap()[0] {
            Value::DateTime(dt) => assert_eq!(dt.year(), 2023),
            other => panic!("expected datetime, got {other:?}"),
        }
    }

    #[test]
    fn test_derive_year_by_name_hint() {
        let mut t = raw();
        let schema = infer_schema(&t);
        derive_year(&mut t, &schema, None);
        let years = t.column("year").expect("year column derived");
        assert_eq!(years[0], Value::Int(2023));
        assert_eq!(years[1], Value::Int(2024));
        assert_eq!(years[2], Value::Null);
    }

    #[test]
    fn test_derive_year_with_explicit_column() {
        let mut t = Table::from_columns(vec![(
            "when".to_string(),
            vec![Value::from("2022-03-01"), Value::from("2021-12-31")],
        )])
        .unwrap();
        let schema = infer_schema(&t);
        derive_year(&mut t, &schema, Some("when"));
        assert_eq!(t.column("year").unwrap()[0], Value::Int(2022));
    }

    #[test]
    fn test_derive_year_without_candidate() {
        let mut t = Table::from_columns(vec![(
            "state".to_string(),
            vec![Value::from("TX")],
        )])
        .unwrap();
        let schema = infer_schema(&t);
        derive_year(&mut t, &schema, None);
        assert!(!t.has_column("year"));
    }
}
