//! Interactive question session.
//!
//! Owns the loaded table for the lifetime of the process and answers one
//! question at a time: plan, execute, format, optionally annotate with
//! insights. Once the loop is running, every question resolves to some
//! printable text; failures become diagnostics, never a crash.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::answer::{format_answer, format_failure};
use crate::executor::execute;
use crate::insight::InsightGenerator;
use crate::planner::plan_from_nl;
use crate::table::{Schema, Table};

/// One interactive session over one loaded dataset.
pub struct Session {
    table: Table,
    schema: Schema,
    insights: Option<InsightGenerator>,
}

impl Session {
    pub fn new(table: Table, insights: Option<InsightGenerator>) -> Self {
        let schema = Schema::of(&table);
        Self {
            table,
            schema,
            insights,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Answer a single question.
    pub async fn ask(&self, question: &str) -> String {
        let columns: Vec<String> = self
            .table
            .column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let plan = plan_from_nl(question, &columns);
        debug!(kind = plan.kind(), "planned question");

        match execute(&self.table, &plan) {
            Ok((result, method)) => {
                let mut text = format_answer(&result, &plan, &method);
                if let Some(generator) = &self.insights {
                    if let Some(insight) = generator
                        .generate(question, &plan, &result, &self.schema)
                        .await
                    {
                        text.push_str("\n\nInsights (caveated):\n");
                        text.push_str(&insight);
                    }
                }
                text
            }
            Err(e) => {
                warn!(error = %e, "question failed");
                format_failure(&plan, &e.to_string())
            }
        }
    }

    /// Run the interactive loop until the user types `exit` or `quit`.
    pub async fn run(&self) -> std::io::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();

        loop {
            print!("\nAsk a question > ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if matches!(question.to_lowercase().as_str(), "exit" | "quit") {
                println!("Goodbye!");
                break;
            }
            println!("{}", self.ask(question).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn session() -> Session {
        let table = Table::from_columns(vec![
            (
                "region".to_string(),
                vec![
                    Value::from("A"),
                    Value::from("A"),
                    Value::from("B"),
                ],
            ),
            (
                "volume".to_string(),
                vec![Value::Float(5.0), Value::Float(7.0), Value::Float(9.0)],
            ),
        ])
        .unwrap();
        Session::new(table, None)
    }

    #[tokio::test]
    async fn test_ask_row_count() {
        let text = session().ask("how many rows").await;
        assert!(text.starts_with("Answer: returned 1 rows x 1 columns."));
        assert!(text.contains(r#""type":"aggregate""#));
        assert!(text.contains("row_count"));
        assert!(text.contains("3"));
    }

    #[tokio::test]
    async fn test_ask_garbage_still_answers() {
        let text = session().ask("flurble").await;
        assert!(text.starts_with("Answer: "));
        assert!(text.contains("Evidence:"));
    }

    #[tokio::test]
    async fn test_ask_top_rows() {
        let text = session().ask("top 2 rows by volume").await;
        assert!(text.contains(r#""type":"sort_top""#));
        assert!(text.contains("returned 2 rows"));
    }
}
