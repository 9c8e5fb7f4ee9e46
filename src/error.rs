//! Error types for the CRDO core

use thiserror::Error;

use crate::types::SessionState;

/// Errors that can occur while tracking sessions or exchanging data
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Cannot {action} while session is {state}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid base64 payload: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Import rejected: {0}")]
    ImportError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TrackerError {
    pub(crate) fn invalid_transition(action: &'static str, state: SessionState) -> Self {
        tracing::warn!(action, %state, "rejected session transition");
        TrackerError::InvalidTransition { action, state }
    }
}
