//! Dataset ingestion.
//!
//! Resolves a dataset from a local path, a URL (plain HTTP/S or a Google
//! Drive share link), the configured default path, or an interactive
//! prompt, then parses it by format. Startup fails fatally when nothing
//! resolves; the error names every attempted path.

pub mod download;
pub mod prepare;

pub use download::{extract_drive_file_id, fetch_to_dir};
pub use prepare::{clean_table, derive_year, infer_schema};

use std::fmt;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::DateTime;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use tracing::{info, warn};

use crate::error::DatasetError;
use crate::table::{Table, Value};

/// Directory URL downloads land in.
const DOWNLOAD_DIR: &str = "data";

/// Timeout for the dataset download round-trip.
const DOWNLOAD_TIMEOUT_SECS: u64 = 120;

/// Candidate CSV delimiters, tried against the header line when no
/// override is given.
const CSV_DELIMITERS: &[u8] = b",;\t|";

/// Detected source format, reported once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Excel,
    Parquet,
    /// Extension was unknown; the file parsed as CSV anyway.
    CsvGuessed,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "excel",
            Self::Parquet => "parquet",
            Self::CsvGuessed => "csv?",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the dataset should come from.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Local path to the dataset.
    pub path: Option<String>,
    /// HTTP/HTTPS or Google Drive link to download.
    pub url: Option<String>,
    /// CSV delimiter override.
    pub sep: Option<char>,
    /// Excel sheet name.
    pub sheet: Option<String>,
}

/// Load the dataset per the resolution order: explicit path, URL
/// download, configured default, interactive prompt.
pub async fn load_table(
    opts: &LoadOptions,
    default_path: &Path,
) -> std::result::Result<(Table, SourceFormat), DatasetError> {
    let mut attempted: Vec<String> = Vec::new();

    let mut chosen: Option<PathBuf> = opts.path.as_ref().map(PathBuf::from);

    if chosen.is_none() {
        if let Some(url) = &opts.url {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
                .build()?;
            chosen = Some(fetch_to_dir(&client, url, Path::new(DOWNLOAD_DIR)).await?);
        }
    }

    let mut chosen = chosen.unwrap_or_else(|| default_path.to_path_buf());

    if !chosen.exists() {
        attempted.push(chosen.display().to_string());
        if let Some(candidate) = prompt_for_path(&chosen) {
            chosen = candidate;
        }
    }

    if !chosen.exists() {
        let path_str = chosen.display().to_string();
        if attempted.last() != Some(&path_str) {
            attempted.push(path_str);
        }
        return Err(DatasetError::NotFound {
            attempted: attempted
                .iter()
                .map(|p| format!("'{p}'"))
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    info!(path = %chosen.display(), "loading dataset");
    read_table(&chosen, opts.sep, opts.sheet.as_deref())
}

/// Ask once on stdin for a replacement path. Returns `None` on empty
/// input or closed stdin.
fn prompt_for_path(missing: &Path) -> Option<PathBuf> {
    eprint!(
        "Dataset not found at {}. Enter a local file path or press Enter to cancel: ",
        missing.display()
    );
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => {
            let trimmed = line.trim();
            (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
        }
        Err(_) => None,
    }
}

/// Parse a local dataset file, dispatching on its extension.
pub fn read_table(
    path: &Path,
    sep: Option<char>,
    sheet: Option<&str>,
) -> std::result::Result<(Table, SourceFormat), DatasetError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" | "txt" => Ok((read_csv(path, sep)?, SourceFormat::Csv)),
        "xlsx" | "xls" => Ok((read_excel(path, sheet)?, SourceFormat::Excel)),
        "parquet" => Ok((read_parquet(path)?, SourceFormat::Parquet)),
        other => {
            // Unknown extension: csv is the most likely answer.
            warn!(extension = %other, "unknown dataset extension, trying csv");
            match read_csv(path, sep) {
                Ok(table) => Ok((table, SourceFormat::CsvGuessed)),
                Err(_) => Err(DatasetError::UnsupportedFormat(format!(".{other}"))),
            }
        }
    }
}

// ============================================================================
// CSV
// ============================================================================

fn read_csv(path: &Path, sep: Option<char>) -> std::result::Result<Table, DatasetError> {
    let delimiter = match sep {
        Some(c) => c as u8,
        None => sniff_delimiter(path)?,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (i, column) in columns.iter_mut().enumerate() {
            let cell = record.get(i).unwrap_or("");
            if cell.is_empty() {
                column.push(Value::Null);
            } else {
                column.push(Value::from(cell));
            }
        }
    }

    Table::from_columns(headers.into_iter().zip(columns).collect())
        .map_err(|e| DatasetError::UnsupportedFormat(e.to_string()))
}

/// Pick the delimiter that occurs most often in the header line.
fn sniff_delimiter(path: &Path) -> std::result::Result<u8, DatasetError> {
    let file = std::fs::File::open(path)?;
    let mut first_line = String::new();
    std::io::BufReader::new(file).read_line(&mut first_line)?;
    Ok(CSV_DELIMITERS
        .iter()
        .copied()
        .max_by_key(|&d| first_line.bytes().filter(|&b| b == d).count())
        .filter(|&d| first_line.bytes().any(|b| b == d))
        .unwrap_or(b','))
}

// ============================================================================
// Excel
// ============================================================================

fn read_excel(path: &Path, sheet: Option<&str>) -> std::result::Result<Table, DatasetError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| DatasetError::Excel(e.to_string()))?;
    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| DatasetError::Excel("workbook has no sheets".to_string()))?,
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| DatasetError::Excel(e.to_string()))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                Data::Empty => format!("column_{i}"),
                other => other.to_string().trim().to_string(),
            })
            .collect(),
        None => return Ok(Table::new()),
    };

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (i, column) in columns.iter_mut().enumerate() {
            column.push(match row.get(i) {
                Some(cell) => excel_value(cell),
                None => Value::Null,
            });
        }
    }

    Table::from_columns(headers.into_iter().zip(columns).collect())
        .map_err(|e| DatasetError::Excel(e.to_string()))
}

fn excel_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(v) => Value::Int(*v),
        Data::Float(v) => Value::Float(*v),
        Data::Bool(v) => Value::Bool(*v),
        Data::String(s) => {
            if s.is_empty() {
                Value::Null
            } else {
                Value::Str(s.clone())
            }
        }
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Value::DateTime)
            .unwrap_or(Value::Null),
        Data::Error(_) => Value::Null,
        other => Value::Str(other.to_string()),
    }
}

// ============================================================================
// Parquet
// ============================================================================

fn read_parquet(path: &Path) -> std::result::Result<Table, DatasetError> {
    let file = std::fs::File::open(path)?;
    let reader =
        SerializedFileReader::new(file).map_err(|e| DatasetError::Parquet(e.to_string()))?;
    let row_iter = reader
        .get_row_iter(None)
        .map_err(|e| DatasetError::Parquet(e.to_string()))?;

    let mut headers: Vec<String> = Vec::new();
    let mut columns: Vec<Vec<Value>> = Vec::new();
    for row in row_iter {
        let row = row.map_err(|e| DatasetError::Parquet(e.to_string()))?;
        if headers.is_empty() {
            for (name, _) in row.get_column_iter() {
                headers.push(name.clone());
                columns.push(Vec::new());
            }
        }
        for (i, (_, field)) in row.get_column_iter().enumerate() {
            if let Some(column) = columns.get_mut(i) {
                column.push(parquet_value(field));
            }
        }
    }

    Table::from_columns(headers.into_iter().zip(columns).collect())
        .map_err(|e| DatasetError::Parquet(e.to_string()))
}

fn parquet_value(field: &Field) -> Value {
    match field {
        Field::Null => Value::Null,
        Field::Bool(v) => Value::Bool(*v),
        Field::Byte(v) => Value::Int(*v as i64),
        Field::Short(v) => Value::Int(*v as i64),
        Field::Int(v) => Value::Int(*v as i64),
        Field::Long(v) => Value::Int(*v),
        Field::UByte(v) => Value::Int(*v as i64),
        Field::UShort(v) => Value::Int(*v as i64),
        Field::UInt(v) => Value::Int(*v as i64),
        Field::ULong(v) => Value::Int(*v as i64),
        Field::Float(v) => Value::Float(*v as f64),
        Field::Double(v) => Value::Float(*v),
        Field::Str(s) => Value::Str(s.clone()),
        Field::TimestampMillis(ms) => DateTime::from_timestamp_millis(*ms)
            .map(|dt| Value::DateTime(dt.naive_utc()))
            .unwrap_or(Value::Null),
        Field::TimestampMicros(us) => DateTime::from_timestamp_micros(*us)
            .map(|dt| Value::DateTime(dt.naive_utc()))
            .unwrap_or(Value::Null),
        other => Value::Str(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_read_csv_with_nulls() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_csv(&dir, "data.csv", "region,volume\nA,10\nB,\n,30\n");
        let (table, fmt) = read_table(&path, None, None).unwrap();
        assert_eq!(fmt, SourceFormat::Csv);
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.column("volume").unwrap()[1], Value::Null);
        assert_eq!(table.column("region").unwrap()[2], Value::Null);
    }

    #[test]
    fn test_delimiter_sniffing() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_csv(&dir, "data.csv", "region|volume\nA|10\nB|20\n");
        let (table, _) = read_table(&path, None, None).unwrap();
        assert_eq!(table.column_names(), vec!["region", "volume"]);
        assert_eq!(table.n_rows(), 2);
    }

    #[test]
    fn test_delimiter_override() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_csv(&dir, "data.csv", "a;b\n1;2\n");
        let (table, _) = read_table(&path, Some(';'), None).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_unknown_extension_falls_back_to_csv() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_csv(&dir, "data.dat", "a,b\n1,2\n");
        let (table, fmt) = read_table(&path, None, None).unwrap();
        assert_eq!(fmt, SourceFormat::CsvGuessed);
        assert_eq!(table.n_rows(), 1);
    }

    #[tokio::test]
    async fn test_load_table_not_found_names_path() {
        let opts = LoadOptions {
            path: Some("/definitely/not/here.csv".to_string()),
            ..LoadOptions::default()
        };
        let err = load_table(&opts, Path::new("data/unused.csv"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.csv"));
    }
}
