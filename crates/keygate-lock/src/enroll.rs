//! Fresh-login credential enrollment.
//!
//! The write path mirror of the controller's read path: a login flow
//! that has obtained a token writes the locked credential, the optional
//! background copy, and the cached metadata, then commits the session
//! itself. The lock controller never performs these writes; it only
//! verifies them later.

use keygate_core::UserMeta;
use keygate_secrets::{
    AccessPolicy, Result, SecretStore, BACKGROUND_TOKEN, SERVICE_KEY, USER_META,
};
use tracing::{debug, warn};

/// Persist a fresh login's credentials.
///
/// Writes `service_key` under the biometric-or-passcode policy and
/// `background_token` without one. The metadata write is best effort: a
/// failure there degrades later unlocks to secret-only profile fields
/// and is logged, not propagated.
///
/// After this returns, the caller commits the profile with
/// `Session::login` directly.
pub async fn persist_credentials(
    store: &dyn SecretStore,
    username: &str,
    token: &str,
    meta: &UserMeta,
) -> Result<()> {
    store
        .set(SERVICE_KEY, username, token, AccessPolicy::BiometricOrPasscode)
        .await?;
    store
        .set(BACKGROUND_TOKEN, username, token, AccessPolicy::Open)
        .await?;

    match serde_json::to_string(meta) {
        Ok(json) => {
            if let Err(e) = store.set(USER_META, username, &json, AccessPolicy::Open).await {
                warn!("Failed to persist user metadata: {}", e);
            }
        }
        Err(e) => warn!("Failed to encode user metadata: {}", e),
    }

    debug!(username, "Credentials enrolled");
    Ok(())
}
