//! The lock controller state machine.
//!
//! Orchestrates startup verification, periodic re-verification, and
//! foreground re-verification of the stored credential, and owns the
//! `checking_auth`/`is_locked` flags the UI gates on.
//!
//! # State machine
//!
//! `CHECKING` (initial) resolves to one of:
//! - *unauthenticated* — no stored credential, no prompt shown;
//! - *locked* — a credential exists but the current biometric check has
//!   not yet succeeded (`is_locked == true`, UI blocked);
//! - *unlocked* — authenticated and not locked.
//!
//! A failed unlock is fatal: the controller signals a hard-exit request
//! to the host rather than fall through to an unauthenticated screen
//! with stale local data.

use crate::host::HostExit;
use crate::lifecycle::AppLifecycle;
use crate::pipeline;
use chrono::{DateTime, Utc};
use keygate_secrets::{SecretError, SecretStore, BACKGROUND_TOKEN, SERVICE_KEY, USER_META};
use keygate_session::Session;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// The transient flags the UI gates on. Non-persisted; reset on process
/// start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockFlags {
    /// Initial verification in progress; the UI must block on a loading
    /// indicator.
    pub checking_auth: bool,
    /// A previously-authenticated session exists but the current
    /// biometric check has not yet succeeded. The authenticated content
    /// tree must never render while this is set, even though the session
    /// itself may be authenticated.
    pub is_locked: bool,
}

/// Orchestrates credential verification and owns the UI gate flags.
pub struct LockController {
    session: Session,
    store: Arc<dyn SecretStore>,
    host: Arc<dyn HostExit>,
    lifecycle: watch::Receiver<AppLifecycle>,
    check_interval: Option<Duration>,
    flags_tx: watch::Sender<LockFlags>,
    /// In-flight guard: at most one verification at a time across
    /// startup, timer ticks, and foreground triggers. A trigger arriving
    /// while one is in flight is dropped, never queued, which prevents
    /// prompt stacking.
    guard: Mutex<()>,
    exit_requested: AtomicBool,
    last_verified: std::sync::Mutex<Option<DateTime<Utc>>>,
}

impl LockController {
    /// Create a controller.
    ///
    /// `check_interval` is the periodic re-verification cadence while
    /// authenticated; `None` disables the timer (foreground checks still
    /// run).
    #[must_use]
    pub fn new(
        session: Session,
        store: Arc<dyn SecretStore>,
        host: Arc<dyn HostExit>,
        lifecycle: watch::Receiver<AppLifecycle>,
        check_interval: Option<Duration>,
    ) -> Self {
        let (flags_tx, _) = watch::channel(LockFlags::default());
        Self {
            session,
            store,
            host,
            lifecycle,
            check_interval,
            flags_tx,
            guard: Mutex::new(()),
            exit_requested: AtomicBool::new(false),
            last_verified: std::sync::Mutex::new(None),
        }
    }

    /// Current flag snapshot.
    #[must_use]
    pub fn flags(&self) -> LockFlags {
        *self.flags_tx.borrow()
    }

    /// Subscribe to flag changes.
    #[must_use]
    pub fn subscribe_flags(&self) -> watch::Receiver<LockFlags> {
        self.flags_tx.subscribe()
    }

    /// When the last successful proof-of-possession check completed.
    #[must_use]
    pub fn last_verified(&self) -> Option<DateTime<Utc>> {
        *self.last_verified.lock().expect("last_verified lock poisoned")
    }

    fn update_flags(&self, f: impl FnOnce(&mut LockFlags)) {
        self.flags_tx.send_modify(f);
    }

    /// Startup verification.
    ///
    /// Checks for a stored credential without prompting; if one exists,
    /// runs the unlock pipeline and commits the merged profile to the
    /// session. `checking_auth` is cleared as a single guaranteed final
    /// step regardless of which branch ran.
    pub async fn startup(&self) {
        let _permit = self.guard.lock().await;
        self.update_flags(|f| f.checking_auth = true);
        self.run_startup_stages().await;
        self.update_flags(|f| f.checking_auth = false);
    }

    async fn run_startup_stages(&self) {
        match pipeline::check_stored(self.store.as_ref()).await {
            Ok(false) => {
                debug!("No stored credential; starting unauthenticated");
                return;
            }
            Err(e) => {
                // Recoverable init failure: stay unauthenticated, never
                // surface an error to the UI.
                warn!("Startup credential check failed: {}", e);
                return;
            }
            Ok(true) => {}
        }

        self.update_flags(|f| f.is_locked = true);
        match pipeline::unlock(self.store.as_ref()).await {
            Ok(cred) => {
                let meta = pipeline::read_metadata(self.store.as_ref()).await;
                let profile = pipeline::merge_profile(meta, &cred);
                info!(
                    username = profile.username.as_deref().unwrap_or("<unknown>"),
                    "Startup unlock succeeded"
                );
                self.session.login(profile);
                self.mark_verified();
                self.update_flags(|f| f.is_locked = false);
            }
            Err(e) => self.fatal_unlock(&e),
        }
    }

    /// Re-verify proof of possession (periodic tick or foreground
    /// trigger).
    ///
    /// Skipped when another verification is already in flight. On
    /// success the lock clears; on failure the host is asked to exit.
    pub async fn verify(&self) {
        let Ok(_permit) = self.guard.try_lock() else {
            debug!("Verification already in flight; dropping trigger");
            return;
        };

        self.update_flags(|f| f.is_locked = true);
        match pipeline::unlock(self.store.as_ref()).await {
            Ok(_cred) => {
                self.mark_verified();
                self.update_flags(|f| f.is_locked = false);
            }
            Err(e) => self.fatal_unlock(&e),
        }
    }

    /// Drive the periodic and foreground triggers until `cancel` fires.
    ///
    /// The interval and the lifecycle subscription are acquired together
    /// when the session becomes authenticated and released together when
    /// it logs out, on every exit path.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut session_rx = self.session.subscribe();

        loop {
            if !session_rx.borrow_and_update().authenticated() {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    changed = session_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        continue;
                    }
                }
            }

            if self.watch_while_authenticated(&cancel, &mut session_rx).await {
                return;
            }
        }
    }

    /// Inner loop holding the scoped resources. Returns `true` on
    /// teardown, `false` when the session logged out and the resources
    /// should be released.
    async fn watch_while_authenticated(
        &self,
        cancel: &CancellationToken,
        session_rx: &mut watch::Receiver<keygate_session::SessionState>,
    ) -> bool {
        let mut lifecycle_rx = self.lifecycle.clone();
        lifecycle_rx.mark_unchanged();
        let mut lifecycle_alive = true;

        let mut ticker = self.check_interval.map(|period| {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            // A missed tick is dropped, not queued.
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            interval
        });

        loop {
            tokio::select! {
                () = cancel.cancelled() => return true,

                changed = session_rx.changed() => {
                    if changed.is_err() {
                        return true;
                    }
                    if !session_rx.borrow_and_update().authenticated() {
                        debug!("Session logged out; releasing timer and lifecycle subscription");
                        return false;
                    }
                }

                () = tick(ticker.as_mut()) => {
                    self.verify().await;
                    // A transition that resolved while the check was in
                    // flight is dropped, never replayed as a second prompt.
                    lifecycle_rx.mark_unchanged();
                }

                changed = lifecycle_rx.changed(), if lifecycle_alive => {
                    if changed.is_err() {
                        lifecycle_alive = false;
                    } else if *lifecycle_rx.borrow_and_update() == AppLifecycle::Active {
                        debug!("Foreground transition; re-verifying");
                        self.verify().await;
                        lifecycle_rx.mark_unchanged();
                    }
                }
            }
        }
    }

    /// Durable logout: clear every secret store namespace, then the
    /// session. Idempotent — a second call is a no-op and raises no
    /// error.
    pub async fn logout(&self) -> Result<(), SecretError> {
        let mut first_err = None;
        for service in [SERVICE_KEY, USER_META, BACKGROUND_TOKEN] {
            if let Err(e) = self.store.delete(service).await {
                warn!("Failed to delete '{}' during logout: {}", service, e);
                first_err.get_or_insert(e);
            }
        }
        self.session.logout();
        self.update_flags(|f| f.is_locked = false);
        match first_err {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    fn mark_verified(&self) {
        *self.last_verified.lock().expect("last_verified lock poisoned") = Some(Utc::now());
    }

    /// A stored credential could not be verified. Terminate rather than
    /// fall through to a usable-looking unauthenticated screen; the
    /// request is issued at most once per process. `is_locked` stays set
    /// so the UI remains blocked for whatever instants remain.
    fn fatal_unlock(&self, err: &SecretError) {
        error!("Unlock failed, requesting app termination: {}", err);
        if !self.exit_requested.swap(true, Ordering::SeqCst) {
            self.host.request_exit();
        }
    }
}

async fn tick(ticker: Option<&mut tokio::time::Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
