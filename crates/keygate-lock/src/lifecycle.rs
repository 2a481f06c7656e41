//! App lifecycle and connectivity signal source.
//!
//! The host shell emits foreground/background and online/offline
//! transitions; the lock controller subscribes to the lifecycle stream
//! and re-verifies on each return to the foreground. Connectivity is
//! carried for the UI's offline notice; the lock core only logs it.

use tokio::sync::watch;

/// Foreground/background state of the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppLifecycle {
    /// App is in the foreground and interactive.
    Active,
    /// App is backgrounded or inactive.
    Background,
}

/// Network reachability as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Network is reachable.
    Online,
    /// Network is unreachable.
    Offline,
}

/// Emitter side of the lifecycle signals.
///
/// Owned by the host shell; subscribers receive only actual transitions
/// (setting the current value again is not a new event).
#[derive(Debug, Clone)]
pub struct LifecycleEvents {
    lifecycle_tx: watch::Sender<AppLifecycle>,
    connectivity_tx: watch::Sender<Connectivity>,
}

impl LifecycleEvents {
    /// Create a source starting in `Active`/`Online`.
    #[must_use]
    pub fn new() -> Self {
        let (lifecycle_tx, _) = watch::channel(AppLifecycle::Active);
        let (connectivity_tx, _) = watch::channel(Connectivity::Online);
        Self {
            lifecycle_tx,
            connectivity_tx,
        }
    }

    /// Report a foreground/background transition.
    pub fn set_lifecycle(&self, state: AppLifecycle) {
        self.lifecycle_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                tracing::debug!("App lifecycle changed to {:?}", state);
                *current = state;
                true
            }
        });
    }

    /// Report a connectivity change.
    pub fn set_connectivity(&self, state: Connectivity) {
        self.connectivity_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                tracing::debug!("Connectivity changed to {:?}", state);
                *current = state;
                true
            }
        });
    }

    /// Subscribe to foreground/background transitions.
    #[must_use]
    pub fn subscribe_lifecycle(&self) -> watch::Receiver<AppLifecycle> {
        self.lifecycle_tx.subscribe()
    }

    /// Subscribe to connectivity changes.
    #[must_use]
    pub fn subscribe_connectivity(&self) -> watch::Receiver<Connectivity> {
        self.connectivity_tx.subscribe()
    }
}

impl Default for LifecycleEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transition_notifies_subscriber() {
        let events = LifecycleEvents::new();
        let mut rx = events.subscribe_lifecycle();

        events.set_lifecycle(AppLifecycle::Background);
        rx.changed().await.expect("transition observed");
        assert_eq!(*rx.borrow(), AppLifecycle::Background);
    }

    #[tokio::test]
    async fn test_same_value_is_not_a_new_event() {
        let events = LifecycleEvents::new();
        let mut rx = events.subscribe_lifecycle();

        events.set_lifecycle(AppLifecycle::Active);
        assert!(!rx.has_changed().expect("channel alive"));
    }

    #[tokio::test]
    async fn test_connectivity_stream_is_independent() {
        let events = LifecycleEvents::new();
        let mut lifecycle_rx = events.subscribe_lifecycle();
        let mut connectivity_rx = events.subscribe_connectivity();

        events.set_connectivity(Connectivity::Offline);
        assert!(connectivity_rx.has_changed().expect("channel alive"));
        assert!(!lifecycle_rx.has_changed().expect("channel alive"));
    }
}
