//! Git-backed content synchronization.
//!
//! Keeps a local checkout of the content repository current:
//!
//! 1. **Command**: clone when the directory is missing, pull otherwise
//! 2. **Loop**: first cycle inline, then one cycle per interval until cancelled
//!
//! # Architecture
//!
//! ```text
//! start(dir) ──► cycle ──► SyncHandle
//!                            │
//!               sleep(60s) ◄─┴─► cycle ──► SyncObserver
//!                  ▲                │
//!                  └────────────────┘  (until cancel)
//! ```

pub mod command;
pub mod task;

use thiserror::Error;

pub use command::{CommandRunner, GitRunner, SyncCommand, DEFAULT_REMOTE_URL};
pub use task::{
    SyncHandle, SyncLoop, SyncObserver, SyncSettings, SyncStatus, TracingObserver,
    DEFAULT_INTERVAL,
};

/// Errors that can occur while syncing content
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command `{command}` failed with exit code {exit_code}")]
    CommandFailed { command: String, exit_code: i32 },

    #[error("Initial content sync failed: {0}")]
    Startup(#[source] Box<SyncError>),

    #[error("Background content sync #{cycle} failed: {source}")]
    Background {
        cycle: u64,
        #[source]
        source: Box<SyncError>,
    },

    #[error("Sync task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl SyncError {
    /// Exit code of the failed git command, if that is what failed
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            SyncError::CommandFailed { exit_code, .. } => Some(*exit_code),
            SyncError::Startup(inner) => inner.exit_code(),
            SyncError::Background { source, .. } => source.exit_code(),
            _ => None,
        }
    }
}
