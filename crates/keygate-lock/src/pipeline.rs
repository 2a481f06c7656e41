//! Staged verification pipeline: has → unlock → read-metadata → merge.
//!
//! Each stage is a small named step returning a tagged result, so the
//! controller commits the session and clears its flags in one place
//! instead of duplicating cleanup per branch.

use keygate_core::{UserMeta, UserProfile};
use keygate_secrets::{AccessPolicy, Credential, SecretError, SecretStore, SERVICE_KEY, USER_META};
use secrecy::ExposeSecret;
use tracing::warn;

/// Whether a locked credential exists at all. Never prompts.
pub(crate) async fn check_stored(store: &dyn SecretStore) -> Result<bool, SecretError> {
    store.has(SERVICE_KEY).await
}

/// The proof-of-possession check: an access-controlled read of the
/// locked credential. The platform prompt resolves inside this call.
///
/// A missing value here means the credential disappeared between `has`
/// and the prompt, or the user cancelled; either way there is no proof,
/// which is an unlock failure.
pub(crate) async fn unlock(store: &dyn SecretStore) -> Result<Credential, SecretError> {
    match store.get(SERVICE_KEY, AccessPolicy::BiometricOrPasscode).await? {
        Some(cred) => Ok(cred),
        None => Err(SecretError::UnlockFailed(
            "no credential released by the prompt".to_string(),
        )),
    }
}

/// Best-effort read of the cached profile metadata.
///
/// Missing or malformed metadata only degrades the profile's optional
/// fields; it never aborts an unlock that already succeeded.
pub(crate) async fn read_metadata(store: &dyn SecretStore) -> Option<UserMeta> {
    let cred = match store.get(USER_META, AccessPolicy::Open).await {
        Ok(Some(cred)) => cred,
        Ok(None) => return None,
        Err(e) => {
            warn!("Failed to read user metadata: {}", e);
            return None;
        }
    };

    match serde_json::from_str::<UserMeta>(cred.secret.expose_secret()) {
        Ok(meta) => Some(meta),
        Err(e) => {
            warn!("Stored user metadata is malformed: {}", e);
            None
        }
    }
}

/// Merge the unlocked credential with cached metadata.
///
/// Metadata wins for id/name/username when present; the credential's own
/// account name is the username fallback. The token always comes from
/// the unlocked secret.
pub(crate) fn merge_profile(meta: Option<UserMeta>, cred: &Credential) -> UserProfile {
    let meta = meta.unwrap_or_default();
    UserProfile::new(
        meta.id,
        meta.name,
        meta.username.or_else(|| Some(cred.username.clone())),
        cred.secret.clone(),
    )
}
