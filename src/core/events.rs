//! Event code mapping
//!
//! WTT ranking rows carry a `SubEventCode`; the prefix tells us the category
//! and therefore the player's gender.

use serde::{Deserialize, Serialize};

/// Player gender as inferred from ranking events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Men,
    #[serde(rename = "W")]
    Women,
    #[serde(rename = "mixed")]
    Mixed,
}

impl Gender {
    /// Directory-friendly group label
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Men => "men",
            Gender::Women => "women",
            Gender::Mixed => "mixed",
        }
    }
}

/// Map a `SubEventCode` to a gender
///
/// `MS`/`MDI` are men's events, `WS`/`WDI` women's, `XD`/`XDI` mixed.
/// Anything else is unknown.
pub fn gender_from_event_code(code: &str) -> Option<Gender> {
    match code.trim() {
        "MS" | "MDI" => Some(Gender::Men),
        "WS" | "WDI" => Some(Gender::Women),
        "XD" | "XDI" => Some(Gender::Mixed),
        _ => None,
    }
}

/// Map a match event label by prefix
///
/// Match lists publish labels such as `MS`, `WD` or `XD U21`; only the
/// leading two letters matter.
pub fn gender_from_event_label(label: &str) -> Option<Gender> {
    let label = label.trim();
    if label.starts_with("MS") || label.starts_with("MD") {
        Some(Gender::Men)
    } else if label.starts_with("WS") || label.starts_with("WD") {
        Some(Gender::Women)
    } else if label.starts_with("XD") {
        Some(Gender::Mixed)
    } else {
        None
    }
}

/// First non-mixed gender found in a list of event codes
pub fn infer_gender<'a, I>(codes: I) -> Option<Gender>
where
    I: IntoIterator<Item = &'a str>,
{
    codes
        .into_iter()
        .filter_map(gender_from_event_code)
        .find(|g| *g != Gender::Mixed)
}
