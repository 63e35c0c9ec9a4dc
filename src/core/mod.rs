//! Parsing heuristics shared by all sources

pub mod events;
pub mod names;
pub mod scores;

// Re-export commonly used types
pub use events::{gender_from_event_code, gender_from_event_label, infer_gender, Gender};
pub use names::{normalize_name, split_association, NameParts};
pub use scores::{compute_set_score, infer_winner, parse_game_scores, GameScore, SetScore, Side};

use serde_json::Value;

/// Lenient integer conversion for JSON fields that may be numbers or strings
pub fn safe_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

/// Parse a comma-separated year list, sorted newest first without duplicates
pub fn parse_years(csv: &str) -> Result<Vec<i32>, std::num::ParseIntError> {
    let mut years = Vec::new();
    for part in csv.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        years.push(part.parse::<i32>()?);
    }
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    Ok(years)
}

/// Inclusive year range, newest first regardless of argument order
pub fn year_range(start: i32, end: i32) -> Vec<i32> {
    let (hi, lo) = if start >= end { (start, end) } else { (end, start) };
    (lo..=hi).rev().collect()
}
