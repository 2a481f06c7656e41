//! Host environment capability for hard-exit requests.
//!
//! A stored-but-unverifiable credential must never downgrade to a
//! usable-looking unauthenticated screen, so a fatal unlock failure asks
//! the host to tear the process down. The capability is injected; tests
//! substitute a counting implementation.

/// Receives the lock controller's hard-exit request.
pub trait HostExit: Send + Sync {
    /// Request that the host terminate the application.
    ///
    /// Called at most once per process, after an unrecoverable unlock
    /// failure. Implementations should not return control to the UI.
    fn request_exit(&self);
}
