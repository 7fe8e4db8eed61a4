//! Best-effort column name resolution.
//!
//! Resolution never fails hard: a name that cannot be matched simply
//! resolves to `None` and the calling rule degrades or falls through.
//! Exact substring matching runs first; fuzzy similarity is the fallback,
//! with documented thresholds so the tie-break behavior is testable in
//! isolation.

/// Similarity floor when matching free question text against a column.
const FUZZY_TEXT_THRESHOLD: f64 = 0.8;

/// Similarity floor for the preference-list fallback.
const FUZZY_PREFERENCE_THRESHOLD: f64 = 0.7;

/// Resolve a column mentioned somewhere in `text`.
///
/// Exact pass: the first column (in dataset order) whose lowercased name
/// occurs as a substring of the lowercased text. Fuzzy pass: the most
/// similar column to the trimmed text, if similarity reaches 0.8.
pub fn resolve_column(text: &str, columns: &[String]) -> Option<String> {
    let text = text.to_lowercase();
    for column in columns {
        if text.contains(&column.to_lowercase()) {
            return Some(column.clone());
        }
    }
    closest_match(text.trim(), columns, FUZZY_TEXT_THRESHOLD)
}

/// First candidate present in `columns`, falling back to the closest
/// fuzzy match for the top candidate (similarity >= 0.7).
pub fn first_present(candidates: &[&str], columns: &[String]) -> Option<String> {
    for candidate in candidates {
        if columns.iter().any(|c| c == candidate) {
            return Some(candidate.to_string());
        }
    }
    candidates
        .first()
        .and_then(|top| closest_match(top, columns, FUZZY_PREFERENCE_THRESHOLD))
}

/// Most similar column at or above the threshold, earliest column winning
/// ties.
fn closest_match(needle: &str, columns: &[String], threshold: f64) -> Option<String> {
    let mut best: Option<(f64, &String)> = None;
    for column in columns {
        let score = strsim::normalized_levenshtein(needle, &column.to_lowercase());
        if score >= threshold && best.map_or(true, |(b, _)| score > b) {
            best = Some((score, column));
        }
    }
    best.map(|(_, column)| column.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_substring_wins() {
        let columns = cols(&["volume", "region"]);
        assert_eq!(
            resolve_column("average volume by region", &columns).as_deref(),
            Some("volume")
        );
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        let columns = cols(&["Delay_Hours"]);
        assert_eq!(
            resolve_column("mean delay_hours", &columns).as_deref(),
            Some("Delay_Hours")
        );
    }

    #[test]
    fn test_fuzzy_fallback() {
        let columns = cols(&["volume"]);
        assert_eq!(resolve_column("volums", &columns).as_deref(), Some("volume"));
    }

    #[test]
    fn test_unresolvable_text() {
        let columns = cols(&["volume", "region"]);
        assert_eq!(resolve_column("what is the answer", &columns), None);
    }

    #[test]
    fn test_first_present_prefers_earlier_candidates() {
        let columns = cols(&["volume", "shipments"]);
        assert_eq!(
            first_present(&["scheduled_quantity", "shipments", "volume"], &columns).as_deref(),
            Some("shipments")
        );
    }

    #[test]
    fn test_first_present_fuzzy_backup() {
        let columns = cols(&["scheduled_qty"]);
        // no exact hit; closest match to the top candidate wins
        assert_eq!(
            first_present(&["scheduled_quantity"], &columns).as_deref(),
            Some("scheduled_qty")
        );
    }

    #[test]
    fn test_first_present_no_match() {
        let columns = cols(&["region"]);
        assert_eq!(first_present(&["scheduled_quantity"], &columns), None);
    }
}
