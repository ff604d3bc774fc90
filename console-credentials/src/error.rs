use console_core::TransportError;
use thiserror::Error;

use crate::policy::ValidationFailed;

#[derive(Debug, Error)]
pub enum CredentialError {
    /// Rejected locally; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationFailed),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CredentialError {
    pub fn is_validation(&self) -> bool {
        matches!(self, CredentialError::Validation(_))
    }
}
