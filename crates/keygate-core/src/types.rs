//! Shared types used across the Keygate session-lock core.
//!
//! This module defines the identity value objects exchanged between the
//! secret store, the session state, and the lock controller.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

/// User identifier as delivered by the login API.
///
/// Backends are inconsistent about whether ids are numeric or string-typed,
/// so both are accepted and round-tripped unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    /// Numeric identifier
    Num(i64),
    /// String identifier
    Str(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for UserId {
    fn from(n: i64) -> Self {
        Self::Num(n)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

/// Authenticated user identity plus the bearer token proving it.
///
/// Created on successful login or on a successful unlock-and-merge of the
/// stored credential; replaced wholesale on each login and cleared on
/// logout. The token is memory-protected and redacted from `Debug` output.
#[derive(Clone)]
pub struct UserProfile {
    /// User id, when known
    pub id: Option<UserId>,
    /// Display name, when known
    pub name: Option<String>,
    /// Login username, when known
    pub username: Option<String>,
    /// Bearer token (never logged)
    token: SecretString,
}

impl UserProfile {
    /// Create a profile from its parts.
    #[must_use]
    pub fn new(
        id: Option<UserId>,
        name: Option<String>,
        username: Option<String>,
        token: SecretString,
    ) -> Self {
        Self {
            id,
            name,
            username,
            token,
        }
    }

    /// The bearer token, still wrapped.
    #[must_use]
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    /// Expose the bearer token for an outgoing request.
    ///
    /// The returned slice should be used immediately and not stored.
    #[must_use]
    pub fn expose_token(&self) -> &str {
        self.token.expose_secret()
    }
}

impl fmt::Debug for UserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserProfile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("token", &"***")
            .finish()
    }
}

/// Cached profile metadata persisted in the plain `user_meta` namespace.
///
/// Identity only — holding this value is never proof of possession. All
/// fields are optional so a partially-populated or older record still
/// decodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserMeta {
    /// User id
    pub id: Option<UserId>,
    /// Login username
    pub username: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Avatar image URL
    pub image: Option<String>,
}
