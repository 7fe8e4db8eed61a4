//! Dataset download over HTTP(S) and Google Drive share links.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::error::DatasetError;

static DRIVE_PATH_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/d/([A-Za-z0-9_-]{20,})/").expect("Invalid regex"));
static DRIVE_QUERY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]id=([A-Za-z0-9_-]{20,})").expect("Invalid regex"));
static FILENAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([^/?#]+)$").expect("Invalid regex"));

/// Extract a Google Drive file id from either the `/d/<id>/` path shape
/// or the `?id=<id>` query shape.
pub fn extract_drive_file_id(url: &str) -> Option<String> {
    DRIVE_PATH_ID_RE
        .captures(url)
        .or_else(|| DRIVE_QUERY_ID_RE.captures(url))
        .map(|caps| caps[1].to_string())
}

/// Guess a file extension from the response content type, falling back to
/// hints in the URL itself. Empty when nothing matches.
pub fn guess_extension(url: &str, content_type: &str) -> &'static str {
    let ct = content_type.to_lowercase();
    if ct.contains("parquet") {
        ".parquet"
    } else if ct.contains("excel") || ct.contains("spreadsheetml") || url.contains("xlsx") {
        ".xlsx"
    } else if ct.contains("csv") || url.to_lowercase().ends_with(".csv") {
        ".csv"
    } else {
        ""
    }
}

/// Download a dataset URL into `target_dir`, returning the local path.
///
/// Google Drive share links are rewritten to the direct-download
/// endpoint. When the URL carries no file-like name, the extension is
/// sniffed from the response headers, defaulting to `.csv`.
pub async fn fetch_to_dir(
    client: &reqwest::Client,
    url: &str,
    target_dir: &Path,
) -> std::result::Result<PathBuf, DatasetError> {
    let file_name = FILENAME_RE
        .captures(url)
        .map(|caps| caps[1].to_string())
        .filter(|name| name.contains('.'));

    let effective_url = if url.contains("drive.google.com") {
        let file_id = extract_drive_file_id(url)
            .ok_or_else(|| DatasetError::DriveUrl(url.to_string()))?;
        format!("https://drive.google.com/uc?export=download&id={file_id}")
    } else {
        url.to_string()
    };

    debug!(url = %effective_url, "downloading dataset");
    let response = client
        .get(&effective_url)
        .send()
        .await?
        .error_for_status()?;

    let file_name = match file_name {
        Some(name) => name,
        None => {
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            let ext = guess_extension(url, content_type);
            let ext = if ext.is_empty() { ".csv" } else { ext };
            format!("downloaded_dataset{ext}")
        }
    };

    let body = response.bytes().await?;
    std::fs::create_dir_all(target_dir)?;
    let path = target_dir.join(&file_name);
    std::fs::write(&path, &body)?;
    info!(path = %path.display(), bytes = body.len(), "dataset downloaded");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_id_from_path_shape() {
        let url = "https://drive.google.com/file/d/1a2B3c4D5e6F7g8H9i0JkLmNoPqRsTuV/view";
        assert_eq!(
            extract_drive_file_id(url).as_deref(),
            Some("1a2B3c4D5e6F7g8H9i0JkLmNoPqRsTuV")
        );
    }

    #[test]
    fn test_drive_id_from_query_shape() {
        let url = "https://drive.google.com/uc?export=download&id=1a2B3c4D5e6F7g8H9i0JkLmNoPqRsTuV";
        assert_eq!(
            extract_drive_file_id(url).as_deref(),
            Some("1a2B3c4D5e6F7g8H9i0JkLmNoPqRsTuV")
        );
    }

    #[test]
    fn test_drive_id_absent() {
        assert_eq!(extract_drive_file_id("https://example.com/data.csv"), None);
    }

    #[test]
    fn test_guess_extension() {
        assert_eq!(guess_extension("u", "application/vnd.apache.parquet"), ".parquet");
        assert_eq!(
            guess_extension(
                "u",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            ),
            ".xlsx"
        );
        assert_eq!(guess_extension("u", "text/csv; charset=utf-8"), ".csv");
        assert_eq!(guess_extension("https://x/data.csv", ""), ".csv");
        assert_eq!(guess_extension("u", "application/octet-stream"), "");
    }
}
