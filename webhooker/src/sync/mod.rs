//! Repository synchronization module.
//!
//! Brings the served destination up to date with the working copy's
//! upstream and reloads the web server.
//!
//! ## Pipeline
//!
//! ```text
//! git fetch --all → git pull → cp -r source/* destination → systemctl reload
//! ```

pub mod pipeline;
pub mod runner;

pub use pipeline::{
    Stage, StageReport, StageStatus, SyncError, SyncOutcome, SyncReport, Synchronizer,
    WEB_SERVER_UNIT,
};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner, StageCommand};
