//! Keygate Secrets - secure credential store capability.
//!
//! Defines the [`SecretStore`] trait consumed by the session-lock core,
//! plus two implementations:
//!
//! - [`KeyringStore`] - OS-native keychains (Keychain, Credential Manager,
//!   keyutils/Secret Service)
//! - [`MemoryStore`] - in-process store with scripted prompt outcomes,
//!   used by tests and headless development
//!
//! # Security model
//!
//! A store holds named *services* (namespaces), each with one
//! username/secret pair. A service written with
//! [`AccessPolicy::BiometricOrPasscode`] is released only after the
//! platform's biometric-or-passcode prompt resolves; reading it is the
//! single proof-of-possession check in the session-lock design. All other
//! services are cached metadata and are never authentication evidence on
//! their own.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod keyring;
pub mod memory;

pub use error::{Result, SecretError};
pub use keyring::KeyringStore;
pub use memory::{MemoryStore, PromptOutcome};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Service holding the username + bearer token, guarded by the
/// biometric-or-passcode policy. Every read prompts.
pub const SERVICE_KEY: &str = "service_key";

/// Service holding cached profile metadata as plain JSON. Never prompts.
pub const USER_META: &str = "user_meta";

/// Optional unguarded copy of the token for background use.
pub const BACKGROUND_TOKEN: &str = "background_token";

/// Access-control policy applied to a stored service.
///
/// Persistent stores record the policy with the entry, so the intended
/// protection level survives even on backends that cannot enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    /// No platform gate; the value is released without a prompt.
    #[default]
    Open,
    /// The platform requires any enrolled biometric or the device
    /// passcode before releasing the value.
    BiometricOrPasscode,
}

/// A username/secret pair retrieved from a store.
#[derive(Clone)]
pub struct Credential {
    /// Account name stored alongside the secret.
    pub username: String,
    /// The secret value (never logged).
    pub secret: SecretString,
}

impl Credential {
    /// Create a credential from its parts.
    #[must_use]
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    /// Expose the secret value.
    ///
    /// The returned slice should be used immediately and not stored.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"***")
            .finish()
    }
}

/// Capability wrapper over a platform secure-credential facility.
///
/// Implementations are injected into the lock controller; nothing in the
/// core hard-codes a platform backend.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Whether a value exists for `service`. Never prompts; a missing
    /// value is `Ok(false)`, not an error.
    async fn has(&self, service: &str) -> Result<bool>;

    /// Retrieve the credential stored for `service`.
    ///
    /// With [`AccessPolicy::BiometricOrPasscode`] the call suspends until
    /// the platform prompt resolves. A declined, cancelled, or
    /// unenrollable prompt is [`SecretError::UnlockFailed`]; a missing
    /// value is `Ok(None)`.
    async fn get(&self, service: &str, policy: AccessPolicy) -> Result<Option<Credential>>;

    /// Store `username`/`secret` under `service`, overwriting any
    /// existing value atomically from the caller's perspective.
    async fn set(
        &self,
        service: &str,
        username: &str,
        secret: &str,
        policy: AccessPolicy,
    ) -> Result<()>;

    /// Delete the value for `service`. Deleting a missing service is not
    /// an error.
    async fn delete(&self, service: &str) -> Result<()>;
}
