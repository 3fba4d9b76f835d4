use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssocError {
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Caller misuse: mismatched lengths, out-of-range levels, unknown tags
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Statistics error: {0}")]
    Stats(String),

    #[error("ML error: {0}")]
    Ml(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AssocError>;

/// Check that a significance or FDR level lies strictly inside (0, 1)
///
/// # Errors
/// Returns `InvalidInput` naming the parameter otherwise (NaN included)
pub fn check_level(name: &str, level: f64) -> Result<()> {
    if level > 0.0 && level < 1.0 {
        Ok(())
    } else {
        Err(AssocError::InvalidInput(format!(
            "{name} must be in (0, 1), got {level}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_level() {
        assert!(check_level("q", 0.05).is_ok());
        assert!(check_level("q", 0.0).is_err());
        assert!(check_level("q", 1.0).is_err());
        assert!(check_level("alpha", f64::NAN).is_err());
    }

    #[test]
    fn test_error_display() {
        let err = AssocError::InvalidInput("x and y differ".into());
        assert_eq!(err.to_string(), "Invalid input: x and y differ");
    }
}
