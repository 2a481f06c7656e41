//! Keygate Lock - the session-lock controller.
//!
//! Gates the application's main UI behind a credential stored in a
//! biometric-protected secret store. The controller re-validates proof
//! of possession at startup, on a fixed interval, and on every return to
//! the foreground, and publishes the `checking_auth`/`is_locked` flags
//! the UI blocks on.
//!
//! # Modules
//!
//! - [`controller`] - the state machine and its triggers
//! - [`lifecycle`] - foreground/background and connectivity signals
//! - [`enroll`] - the fresh-login credential write path
//! - [`host`] - hard-exit capability of the host environment
//!
//! # Failure posture
//!
//! No error from this subsystem surfaces as an in-UI message. The only
//! user-visible failure behaviors are the blocking loading indicator and,
//! on an unverifiable stored credential, abrupt app termination.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod controller;
pub mod enroll;
pub mod host;
pub mod lifecycle;
mod pipeline;

pub use controller::{LockController, LockFlags};
pub use enroll::persist_credentials;
pub use host::HostExit;
pub use lifecycle::{AppLifecycle, Connectivity, LifecycleEvents};
