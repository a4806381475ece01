use thiserror::Error;

/// Failures while acquiring the raw league roster.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("Please enter both a clan tag and an API key")]
    MissingInput,

    #[error("Invalid API key or IP address not authorized")]
    Unauthorized,

    #[error("Clan or war not found: {0}")]
    NotFound(String),

    #[error("Clan is not taking part in a Clan War League")]
    NotInLeague,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Could not read roster file: {0}")]
    Io(#[from] std::io::Error),
}

impl AcquisitionError {
    /// Transport hiccups and server-side failures are worth another attempt,
    /// credential and lookup failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            AcquisitionError::Transport(_) => true,
            AcquisitionError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Failures of the remote scoring call.
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Scoring failed ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("Network error during scoring: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected scoring response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ScoringError {
    /// Network trouble and server-side failures; a rejected roster is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScoringError::Transport(_) => true,
            ScoringError::Rejected { status, .. } => *status >= 500,
            ScoringError::Decode(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum CwlError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error("Database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Export error: {0}")]
    Export(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot {action} while in {state}")]
    InvalidTransition { action: &'static str, state: &'static str },

    #[error("Another request is still in flight")]
    Busy,

    #[error("Unknown player: {0}")]
    UnknownPlayer(String),
}

pub type Result<T> = std::result::Result<T, CwlError>;
