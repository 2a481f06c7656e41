//! Keygate application shell.
//!
//! This is the thin shell that wires the session-lock core together:
//! tracing, configuration, the platform secret store, the session, and
//! the lock controller. UI rendering is an external concern; this shell
//! logs the observable state the UI would gate on.

use anyhow::Context;
use keygate_core::AppConfig;
use keygate_lock::{HostExit, LifecycleEvents, LockController};
use keygate_secrets::KeyringStore;
use keygate_session::Session;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Hard-exit capability backed by the real process.
struct ProcessExit;

impl HostExit for ProcessExit {
    fn request_exit(&self) {
        error!("Unrecoverable unlock failure; terminating");
        std::process::exit(1);
    }
}

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,keygate=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Keygate v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_with_env().context("failed to load configuration")?;

    let store = Arc::new(KeyringStore::new(config.store.service_prefix.clone()));
    let session = Session::new();
    let events = LifecycleEvents::new();
    let controller = Arc::new(LockController::new(
        session.clone(),
        store,
        Arc::new(ProcessExit),
        events.subscribe_lifecycle(),
        config.session.check_interval(),
    ));

    // Mirror the gate flags into the log; a UI layer would subscribe the
    // same way.
    let mut flags_rx = controller.subscribe_flags();
    tokio::spawn(async move {
        while flags_rx.changed().await.is_ok() {
            let flags = *flags_rx.borrow();
            debug!(
                checking_auth = flags.checking_auth,
                is_locked = flags.is_locked,
                "Lock flags changed"
            );
        }
    });

    controller.startup().await;

    let snapshot = session.snapshot();
    if let Some(user) = snapshot.user() {
        let verified_at = controller
            .last_verified()
            .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
        info!(
            username = user.username.as_deref().unwrap_or("<unknown>"),
            verified_at = %verified_at,
            "Session unlocked"
        );
    } else {
        info!("No stored session; login required");
    }

    let cancel = CancellationToken::new();
    let run = tokio::spawn({
        let controller = controller.clone();
        let cancel = cancel.clone();
        async move { controller.run(cancel).await }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutting down");
    cancel.cancel();
    run.await.context("lock controller task failed")?;

    Ok(())
}
