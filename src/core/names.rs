//! Player name heuristics
//!
//! ITTF publishes display names mostly as `SURNAME Firstname`, sometimes with
//! a trailing association code (`WANG Chuqin (CHN)`).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Name split into first/last parts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameParts {
    pub first: Option<String>,
    pub last: Option<String>,
    pub full: Option<String>,
}

fn association_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.+?)\s*\(([A-Z]{2,4})\)$").unwrap())
}

/// Strip a trailing `(XXX)` association code from a display name
pub fn split_association(display: &str) -> (String, Option<String>) {
    let display = display.trim();
    match association_pattern().captures(display) {
        Some(caps) => (caps[1].trim().to_string(), Some(caps[2].to_string())),
        None => (display.to_string(), None),
    }
}

fn is_upper_token(token: &str) -> bool {
    token.chars().any(|c| c.is_alphabetic())
        && token.chars().filter(|c| c.is_alphabetic()).all(|c| c.is_uppercase())
}

/// Split a display name into first/last name
///
/// The first all-caps token is taken as the surname and the remaining tokens
/// form the first name. Without any all-caps token the last token is the
/// surname. A single token is always the surname.
///
/// # Examples
/// ```
/// use ttscrape::core::names::normalize_name;
/// let name = normalize_name("WANG Chuqin");
/// assert_eq!(name.first.as_deref(), Some("Chuqin"));
/// assert_eq!(name.last.as_deref(), Some("WANG"));
/// ```
pub fn normalize_name(display: &str) -> NameParts {
    let full = display.trim();
    if full.is_empty() {
        return NameParts::default();
    }

    let parts: Vec<&str> = full.split_whitespace().collect();
    if parts.len() == 1 {
        return NameParts {
            first: None,
            last: Some(parts[0].to_string()),
            full: Some(full.to_string()),
        };
    }

    let (first, last) = match parts.iter().position(|p| is_upper_token(p)) {
        Some(idx) => {
            let rest: Vec<&str> = parts
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != idx)
                .map(|(_, p)| *p)
                .collect();
            (rest.join(" "), parts[idx].to_string())
        }
        None => (
            parts[..parts.len() - 1].join(" "),
            parts[parts.len() - 1].to_string(),
        ),
    };

    NameParts {
        first: if first.is_empty() { None } else { Some(first) },
        last: Some(last),
        full: Some(parts.join(" ")),
    }
}
