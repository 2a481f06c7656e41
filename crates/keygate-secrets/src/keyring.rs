//! OS keychain implementation of [`SecretStore`].
//!
//! Backed by the `keyring` crate:
//! - Windows: Credential Manager
//! - macOS: Keychain
//! - Linux: kernel keyutils
//!
//! Each Keygate service is stored as one keychain entry whose payload is a
//! small JSON object holding the username/secret pair and the
//! [`AccessPolicy`] it was written under. Where the platform supports
//! per-item access control the prompt happens inside its read call, and a
//! denial surfaces here as [`SecretError::UnlockFailed`]. None of the
//! backends above expose a biometric ACL through the `keyring` crate, so
//! a [`AccessPolicy::BiometricOrPasscode`] entry reads back without a
//! prompt on those hosts; the recorded policy is what callers gate on,
//! not the platform's behavior.

use crate::error::{Result, SecretError};
use crate::{AccessPolicy, Credential, SecretStore};
use async_trait::async_trait;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Account name under which every Keygate entry is filed.
const ACCOUNT: &str = "keygate";

/// JSON payload persisted inside a keychain entry.
#[derive(Serialize, Deserialize)]
struct StoredPayload {
    username: String,
    secret: String,
    /// Policy the entry was written under. Entries written before the
    /// policy was recorded decode as `Open`.
    #[serde(default)]
    policy: AccessPolicy,
}

/// Secret store backed by the OS keychain.
pub struct KeyringStore {
    prefix: String,
}

impl KeyringStore {
    /// Create a store namespacing its entries under `prefix`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Fully-qualified platform service name for a Keygate service.
    fn qualified(&self, service: &str) -> String {
        format!("{}.{}", self.prefix, service)
    }

    fn entry(&self, service: &str) -> Result<Entry> {
        Entry::new(&self.qualified(service), ACCOUNT).map_err(SecretError::from)
    }
}

#[async_trait]
impl SecretStore for KeyringStore {
    async fn has(&self, service: &str) -> Result<bool> {
        let entry = self.entry(service)?;
        let found = tokio::task::spawn_blocking(move || match entry.get_password() {
            Ok(_) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(SecretError::from(e)),
        })
        .await
        .map_err(|e| SecretError::Backend(e.to_string()))??;
        Ok(found)
    }

    async fn get(&self, service: &str, policy: AccessPolicy) -> Result<Option<Credential>> {
        let entry = self.entry(service)?;
        let name = service.to_string();
        let payload = tokio::task::spawn_blocking(move || match entry.get_password() {
            Ok(value) => Ok(Some(Zeroizing::new(value))),
            Err(keyring::Error::NoEntry) => Ok(None),
            // With a protected item the platform prompt runs inside
            // get_password; any platform refusal on an access-controlled
            // read is an unlock failure, not a plumbing error.
            Err(e) if policy == AccessPolicy::BiometricOrPasscode => {
                Err(SecretError::UnlockFailed(e.to_string()))
            }
            Err(e) => Err(SecretError::from(e)),
        })
        .await
        .map_err(|e| SecretError::Backend(e.to_string()))??;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let parsed: StoredPayload = serde_json::from_str(&payload).map_err(|e| {
            warn!("Stored payload for '{}' is malformed: {}", name, e);
            SecretError::MalformedPayload(name.clone())
        })?;

        debug!("Retrieved credential for service '{}'", name);
        Ok(Some(Credential::new(parsed.username, parsed.secret)))
    }

    async fn set(
        &self,
        service: &str,
        username: &str,
        secret: &str,
        policy: AccessPolicy,
    ) -> Result<()> {
        let entry = self.entry(service)?;
        let name = service.to_string();
        if policy == AccessPolicy::BiometricOrPasscode {
            warn!(
                "Service '{}' requested the biometric-or-passcode policy; \
                 this backend cannot attach a per-item ACL, the policy is \
                 recorded with the entry only",
                service
            );
        }
        let payload = Zeroizing::new(
            serde_json::to_string(&StoredPayload {
                username: username.to_string(),
                secret: secret.to_string(),
                policy,
            })
            .map_err(|e| SecretError::StoreFailed(e.to_string()))?,
        );

        tokio::task::spawn_blocking(move || {
            entry.set_password(payload.as_str()).map_err(|e| {
                warn!("Failed to store credential for service '{}': {}", name, e);
                SecretError::StoreFailed(e.to_string())
            })
        })
        .await
        .map_err(|e| SecretError::Backend(e.to_string()))??;

        debug!("Stored credential for service '{}'", service);
        Ok(())
    }

    async fn delete(&self, service: &str) -> Result<()> {
        let entry = self.entry(service)?;
        let name = service.to_string();
        tokio::task::spawn_blocking(move || match entry.delete_credential() {
            Ok(()) => {
                debug!("Deleted credential for service '{}'", name);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(SecretError::DeleteFailed(e.to_string())),
        })
        .await
        .map_err(|e| SecretError::Backend(e.to_string()))??;
        Ok(())
    }
}
