//! Keygate Session - the `{authenticated, user}` pair behind the UI gate.
//!
//! Holds session state as pure data with exactly two transitions,
//! [`Session::login`] and [`Session::logout`]. Neither touches stored
//! secrets; persistence and deletion are orchestrated by the lock
//! controller. Readers observe atomic snapshots through a watch channel,
//! so no observer ever sees a half-updated pair.
//!
//! # Invariant
//!
//! `authenticated == true` iff `user` is present. The invariant holds by
//! construction: [`SessionState`] cannot be built in a contradictory
//! shape, and the transitions are the only mutators.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use keygate_core::UserProfile;
use tokio::sync::watch;

/// An atomic snapshot of the session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    user: Option<UserProfile>,
}

impl SessionState {
    /// Whether a user is logged in.
    #[must_use]
    pub fn authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// The logged-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }
}

/// Owner of the session state.
///
/// Cheap to clone; clones share the same underlying channel, so every
/// handle observes the same state.
#[derive(Debug, Clone)]
pub struct Session {
    tx: watch::Sender<SessionState>,
}

impl Session {
    /// Create a new, unauthenticated session.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self { tx }
    }

    /// Transition to authenticated, replacing any previous user wholesale.
    pub fn login(&self, profile: UserProfile) {
        tracing::info!(
            username = profile.username.as_deref().unwrap_or("<unknown>"),
            "Session login"
        );
        self.tx.send_replace(SessionState {
            user: Some(profile),
        });
    }

    /// Transition to unauthenticated, clearing the user.
    ///
    /// Does not delete stored secrets; whoever requests logout must also
    /// clear every secret store namespace for the logout to be durable.
    pub fn logout(&self) {
        tracing::info!("Session logout");
        self.tx.send_replace(SessionState::default());
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Whether a user is currently logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().authenticated()
    }

    /// Subscribe to state changes. Each received value is a complete,
    /// atomic snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keygate_core::UserId;
    use secrecy::SecretString;

    fn profile(username: &str, token: &str) -> UserProfile {
        UserProfile::new(
            Some(UserId::Num(7)),
            Some("Alice".to_string()),
            Some(username.to_string()),
            SecretString::from(token.to_string()),
        )
    }

    #[test]
    fn test_initial_state_unauthenticated() {
        let session = Session::new();
        assert!(!session.is_authenticated());
        assert!(session.snapshot().user().is_none());
    }

    #[test]
    fn test_login_sets_user_and_flag_together() {
        let session = Session::new();
        session.login(profile("alice", "tok123"));

        let state = session.snapshot();
        assert!(state.authenticated());
        assert_eq!(
            state.user().and_then(|u| u.username.as_deref()),
            Some("alice")
        );
    }

    #[test]
    fn test_logout_clears_user_and_flag_together() {
        let session = Session::new();
        session.login(profile("alice", "tok123"));
        session.logout();

        let state = session.snapshot();
        assert!(!state.authenticated());
        assert!(state.user().is_none());
    }

    #[test]
    fn test_login_replaces_wholesale() {
        let session = Session::new();
        session.login(profile("alice", "tok123"));
        session.login(profile("bob", "tok456"));

        let state = session.snapshot();
        assert_eq!(
            state.user().and_then(|u| u.username.as_deref()),
            Some("bob")
        );
        assert_eq!(state.user().map(UserProfile::expose_token), Some("tok456"));
    }

    #[test]
    fn test_invariant_holds_in_every_snapshot() {
        let session = Session::new();
        for _ in 0..3 {
            session.login(profile("alice", "tok123"));
            let s = session.snapshot();
            assert_eq!(s.authenticated(), s.user().is_some());
            session.logout();
            let s = session.snapshot();
            assert_eq!(s.authenticated(), s.user().is_some());
        }
    }

    #[tokio::test]
    async fn test_subscriber_observes_transitions() {
        let session = Session::new();
        let mut rx = session.subscribe();

        session.login(profile("alice", "tok123"));
        rx.changed().await.expect("login observed");
        assert!(rx.borrow().authenticated());

        session.logout();
        rx.changed().await.expect("logout observed");
        assert!(!rx.borrow().authenticated());
    }

    #[test]
    fn test_clones_share_state() {
        let session = Session::new();
        let other = session.clone();
        session.login(profile("alice", "tok123"));
        assert!(other.is_authenticated());
    }
}
