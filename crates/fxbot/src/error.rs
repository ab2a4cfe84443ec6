//! Error types for the conversion bot

use thiserror::Error;

/// Broad error classes, used to decide recovery and user-facing wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad user input or an action not allowed in the current state
    Input,
    /// Rate provider or explanation service failure
    Upstream,
    /// Users/favorites store failure
    Persistence,
    /// Missing or invalid configuration
    Config,
}

/// Bot specific errors
#[derive(Debug, Error)]
pub enum BotError {
    /// Amount text could not be parsed
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Currency code is not three ASCII letters
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    /// Action is not legal in the current session state
    #[error("Cannot {action} while {state}")]
    IllegalTransition {
        action: &'static str,
        state: &'static str,
    },

    /// Input could not be decoded into an action
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Favorite id does not exist for this user
    #[error("Favorite {0} not found")]
    FavoriteNotFound(i64),

    /// Admin-only action requested by a regular user
    #[error("This action is available to admins only")]
    Forbidden,

    /// Upstream call failed after all retry attempts
    #[error("{service} failed after {attempts} attempt(s): {message}")]
    Upstream {
        service: &'static str,
        attempts: u32,
        message: String,
    },

    /// Provider answered, but not with what was asked for
    #[error("Rate provider error: {0}")]
    Provider(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(#[from] fxbot_llm::LLMError),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Owner record missing for a favorite insert
    #[error("User {0} not found")]
    UserNotFound(i64),

    /// Store failure
    #[error("Storage error: {0}")]
    Persistence(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for bot operations
pub type Result<T> = std::result::Result<T, BotError>;

impl BotError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_)
            | Self::InvalidCurrency(_)
            | Self::IllegalTransition { .. }
            | Self::UnknownAction(_)
            | Self::FavoriteNotFound(_)
            | Self::Forbidden => ErrorKind::Input,
            Self::Upstream { .. }
            | Self::Provider(_)
            | Self::Llm(_)
            | Self::Http(_)
            | Self::Json(_) => ErrorKind::Upstream,
            Self::UserNotFound(_) | Self::Persistence(_) => ErrorKind::Persistence,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether the same upstream call may succeed if repeated
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_transient(),
            Self::Provider(_) | Self::Http(_) | Self::Json(_) => true,
            _ => false,
        }
    }
}

impl From<fxbot_utils::EnvError> for BotError {
    fn from(err: fxbot_utils::EnvError) -> Self {
        BotError::Config(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for BotError {
    fn from(err: sqlx::Error) -> Self {
        BotError::Persistence(err.to_string())
    }
}
