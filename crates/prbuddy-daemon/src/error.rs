use prbuddy_llm::LlmError;
use prbuddy_vcs::VcsError;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("{message}")]
    InputError { message: String },
    #[error("{what} not found")]
    NotFound { what: String },
    #[error("{message}")]
    StateError { message: String },
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),
    #[error("vcs error: {0}")]
    Vcs(#[from] VcsError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DaemonError {
    pub fn input(message: impl Into<String>) -> Self {
        DaemonError::InputError {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        DaemonError::NotFound { what: what.into() }
    }

    pub fn state(message: impl Into<String>) -> Self {
        DaemonError::StateError {
            message: message.into(),
        }
    }
}
