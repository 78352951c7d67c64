use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    /// Non-success or unreachable remote response (timeouts included)
    #[error("Transport error: {0}")]
    Transport(String),

    /// A results-table row that cannot be turned into a record
    #[error("Malformed row ({context}): {reason}")]
    MalformedRow { context: String, reason: String },

    /// Failure writing a history file; the previous file is left intact
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Invalid override input, rejected before any remote call
    #[error("Planning error: {0}")]
    Planning(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn malformed(context: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::MalformedRow {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Io(format!("CSV error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Transport(format!("request timed out: {}", err))
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

// Alias for convenience
pub type Error = AppError;
