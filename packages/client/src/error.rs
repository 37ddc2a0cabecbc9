use scribe_editor::EditorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session channel is not open")]
    ChannelUnavailable,

    #[error("Access token expired and could not be refreshed")]
    ReauthenticationRequired,

    #[error("No document is open")]
    NoDocument,

    #[error("Permission denied: {0}")]
    PermissionDenied(&'static str),

    #[error("Scheduler has stopped")]
    Stopped,

    #[error(transparent)]
    Editor(#[from] EditorError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SessionError {
    /// Errors after which the session cannot keep sending
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::ReauthenticationRequired)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Refresh token rejected: {0}")]
    Rejected(String),

    #[error("Auth service unreachable: {0}")]
    Unreachable(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Channel closed")]
    Closed,
}
