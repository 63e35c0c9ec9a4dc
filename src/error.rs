use std::fmt;

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Invalid command-line arguments
    ValidationError(String),
    /// Output file could not be written or read
    Io(std::io::Error),
    /// Output or seed file is not valid JSON
    Json(serde_json::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::Io(e) => write!(f, "I/O error: {}", e),
            AppError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::ValidationError(_) => None,
            AppError::Io(e) => Some(e),
            AppError::Json(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Json(e)
    }
}

/// Earliest year with match data on results.ittf.link
pub const MIN_YEAR: i32 = 1926;
/// Latest year accepted for match queries
pub const MAX_YEAR: i32 = 2100;

/// Validation functions
pub fn validate_year(year: i32) -> Result<(), AppError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(AppError::ValidationError(format!(
            "Year must be between {} and {}, got {}",
            MIN_YEAR, MAX_YEAR, year
        )));
    }
    Ok(())
}

pub fn validate_years(years: &[i32]) -> Result<(), AppError> {
    if years.is_empty() {
        return Err(AppError::ValidationError(
            "At least one year is required".to_string(),
        ));
    }
    years.iter().try_for_each(|y| validate_year(*y))
}

/// Check an inclusive id range and return its length, saturating at `u64::MAX`
pub fn validate_id_range(start: u64, end: u64) -> Result<u64, AppError> {
    if start > end {
        return Err(AppError::ValidationError(format!(
            "Start id must not exceed end id, got {}-{}",
            start, end
        )));
    }
    Ok((end - start).saturating_add(1))
}
