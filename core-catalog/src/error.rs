//! Error types for catalog access

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Catalog errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog could not be reached at all
    #[error("Network error: {0}")]
    Network(String),

    /// The catalog answered with an error status or a body we cannot read
    #[error("Catalog service error{}: {message}", status_suffix(.status))]
    Service {
        status: Option<u16>,
        message: String,
    },

    /// Page or page size out of range
    #[error("Invalid catalog query: {0}")]
    InvalidQuery(String),
}

impl CatalogError {
    pub fn service(message: impl Into<String>) -> Self {
        CatalogError::Service {
            status: None,
            message: message.into(),
        }
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Network(_) => true,
            CatalogError::Service { status, .. } => matches!(status, Some(s) if *s >= 500 || *s == 429),
            CatalogError::InvalidQuery(_) => false,
        }
    }
}

impl From<BridgeError> for CatalogError {
    fn from(error: BridgeError) -> Self {
        if error.is_transport() {
            CatalogError::Network(error.to_string())
        } else {
            CatalogError::service(error.to_string())
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;
