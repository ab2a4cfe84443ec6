//! Environment configuration helpers

use thiserror::Error;

/// Error raised while reading configuration from the environment
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    /// A required variable is unset or blank
    #[error("{0} is not set")]
    Missing(String),
}

/// Load a `.env` file from the working directory or its parents, if any.
///
/// Returns `true` when a file was found and applied.
pub fn load_dotenv() -> bool {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!("Loaded environment from {}", path.display());
            true
        }
        Err(e) if e.not_found() => false,
        Err(e) => {
            tracing::warn!("Ignoring unreadable .env file: {e}");
            false
        }
    }
}

/// Read a variable that must be present and non-blank
pub fn required_var(name: &str) -> Result<String, EnvError> {
    optional_var(name).ok_or_else(|| EnvError::Missing(name.to_string()))
}

/// Read a variable, treating blank values as unset
pub fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_var() {
        let err = required_var("FXBOT_UTILS_TEST_DEFINITELY_UNSET").unwrap_err();
        assert_eq!(err, EnvError::Missing("FXBOT_UTILS_TEST_DEFINITELY_UNSET".to_string()));
        assert_eq!(err.to_string(), "FXBOT_UTILS_TEST_DEFINITELY_UNSET is not set");
    }

    #[test]
    fn test_optional_var_unset() {
        assert!(optional_var("FXBOT_UTILS_TEST_ALSO_UNSET").is_none());
    }
}
