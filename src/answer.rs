//! Answer rendering.
//!
//! Every answer carries the same evidence structure: what came back, the
//! plan that was inferred, the method that ran, and a short preview of
//! the data behind the answer.

use crate::planner::Plan;
use crate::table::Table;

/// Rows shown in the evidence preview.
const PREVIEW_ROWS: usize = 10;

/// Render an executed result with its plan and method description.
pub fn format_answer(result: &Table, plan: &Plan, method_note: &str) -> String {
    let plan_json =
        serde_json::to_string(plan).unwrap_or_else(|_| format!("{plan:?}"));

    let mut out = Vec::with_capacity(6);
    out.push(format!(
        "Answer: returned {} rows x {} columns.",
        result.n_rows(),
        result.n_cols()
    ));
    out.push("Evidence:".to_string());
    out.push(format!("  - Plan: {plan_json}"));
    out.push(format!("  - Method: {method_note}"));
    out.push("  - Preview:".to_string());
    out.push(result.render(PREVIEW_ROWS));
    out.join("\n")
}

/// Render a per-question failure as a printable diagnostic answer. The
/// session loop must always produce output, even when execution fails.
pub fn format_failure(plan: &Plan, error: &str) -> String {
    let plan_json =
        serde_json::to_string(plan).unwrap_or_else(|_| format!("{plan:?}"));

    let mut out = Vec::with_capacity(4);
    out.push(format!("Answer: no result ({error})."));
    out.push("Evidence:".to_string());
    out.push(format!("  - Plan: {plan_json}"));
    out.push("  - Method: aborted before producing a result".to_string());
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    #[test]
    fn test_answer_structure() {
        let result = Table::from_columns(vec![(
            "row_count".to_string(),
            vec![Value::Int(42)],
        )])
        .unwrap();
        let text = format_answer(&result, &Plan::MetaShape, "Dataset shape");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Answer: returned 1 rows x 1 columns.");
        assert_eq!(lines[1], "Evidence:");
        assert!(lines[2].starts_with("  - Plan: "));
        assert!(lines[2].contains("meta:shape"));
        assert_eq!(lines[3], "  - Method: Dataset shape");
        assert_eq!(lines[4], "  - Preview:");
        assert!(text.contains("42"));
    }

    #[test]
    fn test_failure_structure() {
        let text = format_failure(&Plan::MetaShape, "boom");
        assert!(text.starts_with("Answer: no result (boom)."));
        assert!(text.contains("meta:shape"));
    }
}
