//! End-to-end load -> clean -> ask tests over temporary CSV files.

use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;

use tabula::{
    clean_table, derive_year, infer_schema, load_table, plan_from_nl, LoadOptions, Plan, Session,
    SourceFormat, Value,
};

/// Write a small pipeline-shipments style fixture.
fn create_fixture(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("shipments.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(
        b"eff_gas_day,scheduled_quantity,state_abb\n\
          2023-01-01,100,TX\n\
          2023-01-02,110,TX\n\
          2023-01-03,90,LA\n\
          2024-01-01,500,TX\n\
          2024-01-02,,LA\n",
    )
    .unwrap();
    path
}

async fn build_session(dir: &TempDir) -> Session {
    let path = create_fixture(dir);
    let opts = LoadOptions {
        path: Some(path.display().to_string()),
        ..LoadOptions::default()
    };
    let (table, format) = load_table(&opts, &PathBuf::from("unused.csv"))
        .await
        .expect("fixture loads");
    assert_eq!(format, SourceFormat::Csv);

    let schema = infer_schema(&table);
    let mut table = clean_table(table, &schema);
    derive_year(&mut table, &schema, None);
    Session::new(table, None)
}

#[tokio::test]
async fn test_pipeline_load_and_shape() {
    let dir = TempDir::new().unwrap();
    let session = build_session(&dir).await;

    // year derived from the eff_gas_day name hint
    assert!(session.table().has_column("year"));
    assert_eq!(session.table().n_rows(), 5);

    let text = session.ask("what is the dataset shape?").await;
    assert!(text.contains(r#""type":"meta:shape""#));
    assert!(text.contains("Dataset shape"));
}

#[tokio::test]
async fn test_pipeline_filtered_count_by_year() {
    let dir = TempDir::new().unwrap();
    let session = build_session(&dir).await;

    let text = session.ask("how many rows in 2023").await;
    assert!(text.contains("Row count with optional filters"));
    // three 2023 rows in the fixture
    assert!(text.lines().last().unwrap().contains('3'));
}

#[tokio::test]
async fn test_pipeline_sum_by_state() {
    let dir = TempDir::new().unwrap();
    let session = build_session(&dir).await;

    let text = session.ask("total scheduled_quantity by state_abb").await;
    assert!(text.contains(r#""type":"aggregate""#));
    assert!(text.contains("returned 2 rows"));
    // TX sums to 710, LA to 90 (one LA cell is null and skipped)
    assert!(text.contains("710"));
    assert!(text.contains("90"));
}

#[tokio::test]
async fn test_pipeline_top_rows_with_filter() {
    let dir = TempDir::new().unwrap();
    let session = build_session(&dir).await;

    let text = session
        .ask("top 2 rows by scheduled_quantity where state_abb = tx")
        .await;
    assert!(text.contains(r#""type":"sort_top""#));
    assert!(text.contains("returned 2 rows"));
    assert!(text.contains("500"));
    assert!(!text.contains("90"));
}

#[tokio::test]
async fn test_pipeline_outliers_answer() {
    let dir = TempDir::new().unwrap();
    let session = build_session(&dir).await;

    let text = session.ask("any outliers in scheduled_quantity?").await;
    assert!(text.contains(r#""type":"anomaly:zscore""#));
    assert!(text.contains("Z-score outliers on scheduled_quantity"));
}

#[tokio::test]
async fn test_pipeline_missing_summary() {
    let dir = TempDir::new().unwrap();
    let session = build_session(&dir).await;

    let text = session.ask("missing values").await;
    assert!(text.contains(r#""type":"meta:missing""#));
    // scheduled_quantity has one missing cell and sorts to the top
    let preview_start = text.find("Preview:").unwrap();
    let first_data_line = text[preview_start..].lines().nth(2).unwrap();
    assert!(first_data_line.contains("scheduled_quantity"));
}

#[tokio::test]
async fn test_every_question_yields_printable_output() {
    let dir = TempDir::new().unwrap();
    let session = build_session(&dir).await;

    for question in [
        "describe",
        "show columns",
        "head 2",
        "tail",
        "duplicates",
        "unique state_abb values",
        "value counts breakdown of state_abb",
        "correlation",
        "average scheduled_quantity by year",
        "trend over time",
        "complete gibberish question",
        "",
    ] {
        let text = session.ask(question).await;
        assert!(
            text.starts_with("Answer: "),
            "question {question:?} produced unexpected output: {text}"
        );
    }
}

#[test]
fn test_planner_matches_documented_examples() {
    let cols: Vec<String> = ["volume", "region"].iter().map(|s| s.to_string()).collect();
    let plan = plan_from_nl("top 5 rows by volume", &cols);
    match plan {
        Plan::SortTop {
            by,
            ascending,
            top_n,
            filters,
        } => {
            assert_eq!(by, vec!["volume".to_string()]);
            assert!(!ascending);
            assert_eq!(top_n, 5);
            assert!(filters.is_empty());
        }
        other => panic!("expected sort_top, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cleaned_types_survive_roundtrip() {
    let dir = TempDir::new().unwrap();
    let session = build_session(&dir).await;

    let quantities = session.table().column("scheduled_quantity").unwrap();
    assert_eq!(quantities[0], Value::Int(100));
    assert_eq!(quantities[4], Value::Null);
    let years = session.table().column("year").unwrap();
    assert_eq!(years[3], Value::Int(2024));
}
