//! Pairwise Pearson correlation.

use crate::table::{Table, Value};

/// Full pairwise Pearson correlation matrix over the numeric columns.
///
/// When `cols` is non-empty the matrix is restricted to those columns, in
/// the requested order; names that are unknown or non-numeric are dropped
/// without error. Each pair is computed over its pairwise-complete
/// observations. The diagonal is 1.0 and the matrix is symmetric; a pair
/// with fewer than two complete observations or zero variance yields
/// null.
pub fn correlations(table: &Table, cols: &[String]) -> Table {
    let numeric = table.numeric_columns();
    let selected: Vec<String> = if cols.is_empty() {
        numeric
    } else {
        cols.iter()
            .filter(|c| numeric.contains(c))
            .cloned()
            .collect()
    };

    let series: Vec<&[Value]> = selected
        .iter()
        .map(|name| table.column(name).expect("selected column exists"))
        .collect();

    let mut columns: Vec<(String, Vec<Value>)> = Vec::with_capacity(selected.len() + 1);
    columns.push((
        "column".to_string(),
        selected.iter().map(|n| Value::from(n.clone())).collect(),
    ));
    for (j, name) in selected.iter().enumerate() {
        let mut cells = Vec::with_capacity(selected.len());
        for i in 0..selected.len() {
            if i == j {
                cells.push(Value::Float(1.0));
            } else {
                cells.push(match pearson(series[i], series[j]) {
                    Some(r) => Value::Float(r),
                    None => Value::Null,
                });
            }
        }
        columns.push((name.clone(), cells));
    }

    Table::from_columns(columns).expect("fresh columns share one length")
}

/// Pearson r over rows where both cells are present.
fn pearson(a: &[Value], b: &[Value]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter_map(|(x, y)| Some((x.as_f64()?, y.as_f64()?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_columns(vec![
            (
                "x".to_string(),
                vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)],
            ),
            (
                "y".to_string(),
                vec![Value::Float(2.0), Value::Float(4.0), Value::Float(6.0)],
            ),
            (
                "label".to_string(),
                vec![Value::from("a"), Value::from("b"), Value::from("c")],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_perfect_correlation() {
        let out = correlations(&sample(), &[]);
        // label is non-numeric and excluded
        assert_eq!(out.column_names(), vec!["column", "x", "y"]);
        let x_col = out.column("x").unwrap();
        assert_eq!(x_col[0], Value::Float(1.0));
        match &x_col[1] {
            Value::Float(r) => assert!((r - 1.0).abs() < 1e-12),
            other => panic!("expected float, got {other:?}"),
        }
    }

    #[test]
    fn test_restriction_drops_unknown_and_non_numeric() {
        let out = correlations(
            &sample(),
            &["y".to_string(), "label".to_string(), "nope".to_string()],
        );
        assert_eq!(out.column_names(), vec!["column", "y"]);
        assert_eq!(out.n_rows(), 1);
    }

    #[test]
    fn test_constant_column_yields_null_off_diagonal() {
        let t = Table::from_columns(vec![
            (
                "x".to_string(),
                vec![Value::Float(1.0), Value::Float(2.0)],
            ),
            (
                "c".to_string(),
                vec![Value::Float(5.0), Value::Float(5.0)],
            ),
        ])
        .unwrap();
        let out = correlations(&t, &[]);
        assert_eq!(out.column("c").unwrap()[0], Value::Null);
        assert_eq!(out.column("c").unwrap()[1], Value::Float(1.0));
    }
}
