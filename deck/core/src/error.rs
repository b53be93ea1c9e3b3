//! Error types for deck control

use thiserror::Error;

use crate::launcher::{LaunchError, ProcessId};

/// Failures of [`DeckController`](crate::DeckController) operations
///
/// Every variant leaves the controller in a consistent state: either
/// unchanged, or correctly advanced.
#[derive(Debug, Error)]
pub enum DeckError {
    /// `start` was called without a deck name
    #[error("deck: need a deck")]
    EmptyDeckName,

    /// `play_media` was called without a media name
    #[error("media: need a media file")]
    EmptyMediaName,

    /// A presentation is already active
    #[error("deck already running (pid {pid})")]
    AlreadyRunning {
        /// Pid of the active presentation
        pid: ProcessId,
    },

    /// `stop` was called with no active presentation
    #[error("no deck running")]
    NotRunning,

    /// The viewer or media player could not be started
    #[error(transparent)]
    Spawn(LaunchError),

    /// The active presentation process could not be found
    #[error(transparent)]
    Lookup(LaunchError),

    /// The active presentation process could not be terminated
    #[error(transparent)]
    Kill(LaunchError),
}

impl DeckError {
    /// Map a launcher failure from `kill` onto lookup vs. kill failure
    pub(crate) fn from_kill(err: LaunchError) -> Self {
        match err {
            LaunchError::NotFound(_) => Self::Lookup(err),
            other => Self::Kill(other),
        }
    }
}
