//! Error types for secret store operations.

use thiserror::Error;

/// Errors that can occur during secret store operations.
#[derive(Error, Debug)]
pub enum SecretError {
    /// Failed to access the underlying store.
    #[error("failed to access secret store: {0}")]
    AccessDenied(String),

    /// The biometric/passcode check was declined, cancelled, or no
    /// matching enrollment exists.
    #[error("unlock failed: {0}")]
    UnlockFailed(String),

    /// Failed to store the credential.
    #[error("failed to store credential: {0}")]
    StoreFailed(String),

    /// Failed to delete the credential.
    #[error("failed to delete credential: {0}")]
    DeleteFailed(String),

    /// Stored payload could not be decoded.
    #[error("malformed stored payload for service '{0}'")]
    MalformedPayload(String),

    /// Platform store not supported.
    #[error("secret store not supported on this platform")]
    NotSupported,

    /// Internal backend error.
    #[error("secret store error: {0}")]
    Backend(String),
}

impl From<keyring::Error> for SecretError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoStorageAccess(_) => {
                SecretError::AccessDenied("cannot access platform store".to_string())
            }
            keyring::Error::PlatformFailure(e) => SecretError::Backend(e.to_string()),
            other => SecretError::Backend(other.to_string()),
        }
    }
}

/// Result type for secret store operations.
pub type Result<T> = std::result::Result<T, SecretError>;
