use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The host could not reach the remote end at all.
    #[error("Network transport failed: {0}")]
    Transport(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unknown playback session: {0}")]
    UnknownSession(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether the failure happened before any response was received.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BridgeError::Transport(_) | BridgeError::Timeout(_) | BridgeError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(BridgeError::Transport("refused".into()).is_transport());
        assert!(BridgeError::Timeout(Duration::from_secs(1)).is_transport());
        assert!(!BridgeError::OperationFailed("bad json".into()).is_transport());
    }
}
