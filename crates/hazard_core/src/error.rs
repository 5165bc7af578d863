use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Network failure, timeout or non-2xx reply from the remote analyzer.
    #[error("remote analyzer unavailable: {0}")]
    RemoteUnavailable(String),

    /// Remote analyzer answered with a body we cannot use.
    #[error("malformed analyzer response: {0}")]
    MalformedResponse(String),

    #[error("report store error: {0}")]
    ReportStore(String),

    #[error("report not found: {0}")]
    ReportNotFound(String),

    #[error("invalid report: {0}")]
    InvalidReport(String),

    #[error("report {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: String,
        to: String,
    },

    #[error("report {0} is already scored")]
    AlreadyScored(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Errors the caller may retry on explicit user action.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::RemoteUnavailable(_)
                | EngineError::MalformedResponse(_)
                | EngineError::ReportStore(_)
        )
    }

    /// Both remote failure kinds route the arbiter to the fallback scorer.
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            EngineError::RemoteUnavailable(_) | EngineError::MalformedResponse(_)
        )
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            EngineError::MalformedResponse(err.to_string())
        } else {
            EngineError::RemoteUnavailable(err.to_string())
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::ReportStore(err.to_string())
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(err: tokio::task::JoinError) -> Self {
        EngineError::ReportStore(format!("store task failed: {err}"))
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}
