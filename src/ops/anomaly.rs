//! Outlier detection: z-score and isolation forest.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::TableError;
use crate::table::{Table, Value};

/// Fixed seed so repeated questions return identical anomaly sets.
const IFOREST_SEED: u64 = 42;
const IFOREST_TREES: usize = 100;
const IFOREST_MAX_SAMPLES: usize = 256;

/// Epsilon added to the standard deviation so constant columns divide
/// cleanly instead of by zero.
const ZSCORE_EPSILON: f64 = 1e-9;

/// Rows whose |z| meets or exceeds the threshold for one numeric column.
///
/// Uses the population standard deviation (denominator N). Null cells
/// have no z-score and are never flagged.
pub fn zscore_outliers(
    table: &Table,
    col: &str,
    threshold: f64,
) -> std::result::Result<Table, TableError> {
    let column = table
        .column(col)
        .ok_or_else(|| TableError::ColumnNotFound(col.to_string()))?;

    let numbers: Vec<f64> = column.iter().filter_map(Value::as_f64).collect();
    if numbers.is_empty() {
        return Ok(table.select_rows(&[]));
    }
    let n = numbers.len() as f64;
    let mean = numbers.iter().sum::<f64>() / n;
    let var = numbers.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();

    let indices: Vec<usize> = column
        .iter()
        .enumerate()
        .filter(|(_, cell)| {
            cell.as_f64()
                .map(|x| ((x - mean) / (std + ZSCORE_EPSILON)).abs() >= threshold)
                .unwrap_or(false)
        })
        .map(|(i, _)| i)
        .collect();
    Ok(table.select_rows(&indices))
}

/// Rows flagged anomalous by a seeded isolation forest over the given
/// numeric columns.
///
/// Rows with any null among the selected columns are dropped before
/// fitting. The ⌈contamination·n⌉ rows with the highest anomaly scores
/// are returned, in their original order. With no usable columns or no
/// surviving rows the result is an empty table with the same columns.
pub fn iforest_outliers(table: &Table, cols: &[String], contamination: f64) -> Table {
    let numeric = table.numeric_columns();
    let use_cols: Vec<&str> = cols
        .iter()
        .filter(|c| numeric.contains(c))
        .map(String::as_str)
        .collect();
    if use_cols.is_empty() {
        return table.select_rows(&[]);
    }

    let series: Vec<&[Value]> = use_cols
        .iter()
        .map(|name| table.column(name).expect("selected column exists"))
        .collect();

    let mut rows: Vec<usize> = Vec::new();
    let mut matrix: Vec<Vec<f64>> = Vec::new();
    for i in 0..table.n_rows() {
        let point: Option<Vec<f64>> = series.iter().map(|col| col[i].as_f64()).collect();
        if let Some(point) = point {
            rows.push(i);
            matrix.push(point);
        }
    }
    if matrix.is_empty() {
        return table.select_rows(&[]);
    }

    let scores = IsolationForest::fit(&matrix, IFOREST_SEED).scores(&matrix);

    let n_outliers = ((contamination * matrix.len() as f64).ceil() as usize)
        .clamp(0, matrix.len());
    let mut ranked: Vec<usize> = (0..matrix.len()).collect();
    ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    let mut flagged: Vec<usize> = ranked[..n_outliers].iter().map(|&k| rows[k]).collect();
    flagged.sort_unstable();
    table.select_rows(&flagged)
}

// ============================================================================
// Isolation forest
// ============================================================================

/// Minimal isolation forest: an ensemble of randomized binary partition
/// trees; points isolated in few splits score close to 1.
struct IsolationForest {
    trees: Vec<IsoNode>,
    sample_size: usize,
}

enum IsoNode {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<IsoNode>,
        right: Box<IsoNode>,
    },
}

impl IsolationForest {
    fn fit(matrix: &[Vec<f64>], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let sample_size = matrix.len().min(IFOREST_MAX_SAMPLES);
        let height_limit = (sample_size as f64).log2().ceil().max(1.0) as usize;

        let trees = (0..IFOREST_TREES)
            .map(|_| {
                let sample = sample_without_replacement(matrix.len(), sample_size, &mut rng);
                build_tree(matrix, &sample, 0, height_limit, &mut rng)
            })
            .collect();

        Self { trees, sample_size }
    }

    fn scores(&self, matrix: &[Vec<f64>]) -> Vec<f64> {
        let norm = average_path_length(self.sample_size);
        matrix
            .iter()
            .map(|point| {
                let mean_depth: f64 = self
                    .trees
                    .iter()
                    .map(|tree| path_length(tree, point, 0))
                    .sum::<f64>()
                    / self.trees.len() as f64;
                2f64.powf(-mean_depth / norm)
            })
            .collect()
    }
}

fn build_tree(
    matrix: &[Vec<f64>],
    rows: &[usize],
    depth: usize,
    height_limit: usize,
    rng: &mut StdRng,
) -> IsoNode {
    if depth >= height_limit || rows.len() <= 1 {
        return IsoNode::Leaf { size: rows.len() };
    }

    // Splittable features are those with spread inside this partition.
    let n_features = matrix[rows[0]].len();
    let splittable: Vec<(usize, f64, f64)> = (0..n_features)
        .filter_map(|f| {
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for &i in rows {
                lo = lo.min(matrix[i][f]);
                hi = hi.max(matrix[i][f]);
            }
            (hi > lo).then_some((f, lo, hi))
        })
        .collect();
    if splittable.is_empty() {
        return IsoNode::Leaf { size: rows.len() };
    }

    let (feature, lo, hi) = splittable[rng.gen_range(0..splittable.len())];
    let threshold = lo + rng.gen::<f64>() * (hi - lo);
    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
        .iter()
        .copied()
        .partition(|&i| matrix[i][feature] < threshold);

    IsoNode::Split {
        feature,
        threshold,
        left: Box::new(build_tree(matrix, &left_rows, depth + 1, height_limit, rng)),
        right: Box::new(build_tree(matrix, &right_rows, depth + 1, height_limit, rng)),
    }
}

fn path_length(node: &IsoNode, point: &[f64], depth: usize) -> f64 {
    match node {
        IsoNode::Leaf { size } => depth as f64 + average_path_length(*size),
        IsoNode::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if point[*feature] < *threshold {
                path_length(left, point, depth + 1)
            } else {
                path_length(right, point, depth + 1)
            }
        }
    }
}

/// Expected path length of an unsuccessful BST search over n points, the
/// standard isolation-forest normalizer c(n).
fn average_path_length(n: usize) -> f64 {
    const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        n => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

fn sample_without_replacement(n: usize, k: usize, rng: &mut StdRng) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..n).collect();
    for i in 0..k {
        let j = rng.gen_range(i..n);
        pool.swap(i, j);
    }
    pool.truncate(k);
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zscore_constant_column_flags_nothing() {
        let t = Table::from_columns(vec![(
            "x".to_string(),
            vec![Value::Int(5), Value::Int(5), Value::Int(5), Value::Int(5)],
        )])
        .unwrap();
        let out = zscore_outliers(&t, "x", 3.0).unwrap();
        assert_eq!(out.n_rows(), 0);
    }

    #[test]
    fn test_zscore_flags_extreme_value() {
        let mut values: Vec<Value> = (0..20).map(|_| Value::Float(10.0)).collect();
        values[7] = Value::Float(1000.0);
        values[3] = Value::Null;
        let t = Table::from_columns(vec![("x".to_string(), values)]).unwrap();
        let out = zscore_outliers(&t, "x", 3.0).unwrap();
        assert_eq!(out.n_rows(), 1);
        assert_eq!(out.column("x").unwrap()[0], Value::Float(1000.0));
    }

    #[test]
    fn test_zscore_unknown_column() {
        let t = Table::from_columns(vec![("x".to_string(), vec![Value::Int(1)])]).unwrap();
        assert!(matches!(
            zscore_outliers(&t, "nope", 3.0),
            Err(TableError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_iforest_is_deterministic() {
        let mut values: Vec<Value> = (0..50).map(|i| Value::Float(10.0 + (i % 3) as f64)).collect();
        values[13] = Value::Float(500.0);
        let t = Table::from_columns(vec![("x".to_string(), values)]).unwrap();
        let a = iforest_outliers(&t, &["x".to_string()], 0.02);
        let b = iforest_outliers(&t, &["x".to_string()], 0.02);
        assert_eq!(a.n_rows(), b.n_rows());
        assert_eq!(a.n_rows(), 1);
        assert_eq!(a.column("x").unwrap()[0], Value::Float(500.0));
    }

    #[test]
    fn test_iforest_all_null_rows_yield_empty_table() {
        let t = Table::from_columns(vec![
            ("x".to_string(), vec![Value::Null, Value::Null]),
            ("y".to_string(), vec![Value::Int(1), Value::Int(2)]),
        ])
        .unwrap();
        let out = iforest_outliers(&t, &["x".to_string()], 0.1);
        assert_eq!(out.n_rows(), 0);
        assert_eq!(out.column_names(), t.column_names());
    }
}
