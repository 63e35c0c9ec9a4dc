//! Seed id lists from earlier runs
//!
//! Discovery commands write `{"players": [{"IttfId": ...}, ...]}`, the
//! ranking page scrape writes `{"players": {"all_ids": [...]}}`; later runs
//! read the ids back from either shape.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::AppError;

/// Unique ids from a seed file, in file order
pub fn load_seed_ids(path: &Path) -> Result<Vec<String>, AppError> {
    let body = fs::read_to_string(path)?;
    let data: Value = serde_json::from_str(&body)?;
    Ok(seed_ids_from_value(&data))
}

/// Ids from an already parsed seed document
///
/// Accepts numeric or string ids and skips entries without one.
pub fn seed_ids_from_value(data: &Value) -> Vec<String> {
    let players = data.get("players");
    let ids: Vec<&Value> = match players {
        Some(Value::Array(items)) => items.iter().filter_map(|p| p.get("IttfId")).collect(),
        Some(Value::Object(map)) => map
            .get("all_ids")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    let mut seen = BTreeSet::new();
    ids.into_iter()
        .filter_map(|id| match id {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_seed_ids_from_value() {
        let data = json!({"players": [
            {"IttfId": "121558", "name": "WANG Chuqin"},
            {"IttfId": 101919},
            {"name": "no id"},
            {"IttfId": ""},
            {"IttfId": "121558"}
        ]});
        assert_eq!(seed_ids_from_value(&data), vec!["121558", "101919"]);
    }

    #[test]
    fn test_seed_ids_from_id_lists() {
        let data = json!({"players": {"all_ids": ["1", "2", 3], "men_ids": ["1"]}});
        assert_eq!(seed_ids_from_value(&data), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_seed_ids_missing_players() {
        assert!(seed_ids_from_value(&json!({"other": []})).is_empty());
    }

    #[test]
    fn test_load_seed_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seed.json");
        fs::write(&path, r#"{"players": [{"IttfId": "5"}]}"#).unwrap();
        assert_eq!(load_seed_ids(&path).unwrap(), vec!["5"]);

        assert!(load_seed_ids(&dir.path().join("missing.json")).is_err());
        fs::write(&path, "not json").unwrap();
        assert!(matches!(load_seed_ids(&path), Err(AppError::Json(_))));
    }
}
