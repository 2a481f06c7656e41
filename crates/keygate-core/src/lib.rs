//! Keygate Core - Foundation crate for the Keygate session-lock core.
//!
//! This crate provides shared types, error handling, and configuration
//! management that all other Keygate crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Identity value objects (`UserId`, `UserProfile`, `UserMeta`)
//!
//! # Example
//!
//! ```rust
//! use keygate_core::AppConfig;
//!
//! let config = AppConfig::default();
//! assert_eq!(config.session.check_interval_secs, 10);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, SessionConfig, StoreConfig};
pub use error::{ConfigError, ConfigResult, KeygateError, Result};
pub use types::{UserId, UserMeta, UserProfile};
