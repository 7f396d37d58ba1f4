//! Webhooker - GitHub webhook driven site deployment.
//!
//! Receives signed GitHub webhook deliveries and, on every push, brings a
//! served directory up to date with a git working copy.
//!
//! ## Architecture
//!
//! ```text
//! GitHub → POST /webhook → signature check → Synchronizer → git / cp / systemctl
//! ```

pub mod config;
pub mod sync;
pub mod web;

// Re-export commonly used types
pub use self::config::{Config, ConfigError, DEFAULT_CONFIG_PATH, LISTEN_PORT};
pub use sync::{ProcessRunner, SyncReport, Synchronizer};
pub use web::{app, AppState};
