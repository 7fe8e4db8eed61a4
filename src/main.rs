//! tabula CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tabula::{
    clean_table, derive_year, infer_schema, load_table, Config, InsightGenerator, LoadOptions,
    Session,
};

/// tabula: ask questions about a tabular dataset in plain language
#[derive(Parser, Debug)]
#[command(name = "tabula")]
#[command(version, about, long_about = None)]
struct Args {
    /// Local path to dataset (csv/xlsx/parquet)
    #[arg(long)]
    data_path: Option<String>,

    /// HTTP/HTTPS or Google Drive link to download
    #[arg(long)]
    from_url: Option<String>,

    /// CSV delimiter override (e.g., "," or "|")
    #[arg(long)]
    sep: Option<char>,

    /// Excel sheet name to load
    #[arg(long)]
    sheet: Option<String>,

    /// Column to derive a year from (optional)
    #[arg(long)]
    date_col: Option<String>,

    /// Generate caveated insights (uses LLM if key set)
    #[arg(long)]
    insights: bool,
}

fn banner() {
    println!("==========================================");
    println!("  tabula - natural language data agent");
    println!("==========================================");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    banner();
    let args = Args::parse();
    let config = Config::from_env();

    let opts = LoadOptions {
        path: args.data_path,
        url: args.from_url,
        sep: args.sep,
        sheet: args.sheet,
    };
    let (table, format) = load_table(&opts, &config.default_data_path).await?;
    println!(
        "Dataset loaded (format: {format}) with shape ({}, {})",
        table.n_rows(),
        table.n_cols()
    );

    let schema = infer_schema(&table);
    println!(
        "Inferred schema: {}",
        schema
            .iter()
            .map(|(name, dtype)| format!("{name}:{}", dtype.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    );
    let mut table = clean_table(table, &schema);
    derive_year(&mut table, &schema, args.date_col.as_deref());

    let insights = if args.insights {
        if !config.has_insight_credentials() {
            tracing::warn!("--insights set but no provider credentials configured");
        }
        Some(InsightGenerator::from_config(&config))
    } else {
        None
    };

    let session = Session::new(table, insights);
    session.run().await?;
    Ok(())
}
