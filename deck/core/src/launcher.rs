//! Process Launcher
//!
//! Narrow capability interface for starting and terminating external
//! programs. The [`DeckController`](crate::DeckController) never touches
//! `std::process` directly; it talks to a [`ProcessLauncher`], which lets
//! tests substitute a recording fake for the real OS launcher.
//!
//! # Design Philosophy
//!
//! The launcher knows nothing about decks, durations or loop flags. It is
//! handed a program name and an ordered argument list and returns an opaque
//! [`ProcessId`]. Spawning is fire-and-forget: the launcher never waits for
//! the child to exit on its own.
//!
//! Two flavours of spawn exist. [`ProcessLauncher::spawn`] keeps a handle so
//! the process can later be killed. [`ProcessLauncher::spawn_detached`] keeps
//! nothing; the child is reaped by the runtime once it exits.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// OS-level process identifier of a spawned child
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub u32);

impl ProcessId {
    /// Raw pid value
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors reported by a [`ProcessLauncher`]
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The program could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program that was being started
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The child started but the OS reported no pid (it already exited)
    #[error("{program} exited before a pid could be recorded")]
    NoPid {
        /// Program that was being started
        program: String,
    },

    /// No process with this id is known to the launcher
    #[error("process {0} not found")]
    NotFound(ProcessId),

    /// The process was found but could not be terminated
    #[error("failed to kill process {pid}: {source}")]
    Kill {
        /// Process that survived
        pid: ProcessId,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },
}

/// Capability to start and terminate external programs
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    /// Start `program` with `args` and return its pid without waiting for it
    async fn spawn(&self, program: &str, args: &[String]) -> Result<ProcessId, LaunchError>;

    /// Start `program` with `args` without keeping a handle to it
    ///
    /// The returned pid is informational only; it cannot be passed to
    /// [`kill`](Self::kill).
    async fn spawn_detached(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<ProcessId, LaunchError>;

    /// Terminate a process previously returned by [`spawn`](Self::spawn)
    async fn kill(&self, pid: ProcessId) -> Result<(), LaunchError>;
}

/// Launcher backed by real OS processes
///
/// Children from `spawn` are kept so that `kill` can signal and reap them.
/// Detached children are handed to tokio's orphan reaper right away. Children
/// outlive the launcher: dropping it does not terminate anything.
#[derive(Default)]
pub struct SystemLauncher {
    working_dir: Option<PathBuf>,
    children: Mutex<HashMap<ProcessId, Child>>,
}

impl SystemLauncher {
    /// Create a launcher with no tracked children
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run children in `dir`, so relative deck names resolve against it
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Number of children spawned and not yet killed
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.children.lock().len()
    }

    fn start(&self, program: &str, args: &[String]) -> Result<(ProcessId, Child), LaunchError> {
        debug!(program = program, args = ?args, "Spawning process");

        let mut command = Command::new(program);
        command.args(args).kill_on_drop(false);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let child = command
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let pid = child.id().map(ProcessId).ok_or_else(|| LaunchError::NoPid {
            program: program.to_string(),
        })?;

        Ok((pid, child))
    }
}

#[async_trait]
impl ProcessLauncher for SystemLauncher {
    async fn spawn(&self, program: &str, args: &[String]) -> Result<ProcessId, LaunchError> {
        let (pid, child) = self.start(program, args)?;
        self.children.lock().insert(pid, child);
        info!(pid = %pid, program = program, "Process spawned");
        Ok(pid)
    }

    async fn spawn_detached(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<ProcessId, LaunchError> {
        // Dropping the handle without kill_on_drop leaves reaping to tokio
        let (pid, _child) = self.start(program, args)?;
        info!(pid = %pid, program = program, "Detached process spawned");
        Ok(pid)
    }

    async fn kill(&self, pid: ProcessId) -> Result<(), LaunchError> {
        // Take the child out of the map so the lock is not held across the await
        let mut child = self
            .children
            .lock()
            .remove(&pid)
            .ok_or(LaunchError::NotFound(pid))?;

        if let Err(source) = child.kill().await {
            warn!(pid = %pid, error = %source, "Kill failed");
            // Still ours, keep tracking it
            self.children.lock().insert(pid, child);
            return Err(LaunchError::Kill { pid, source });
        }

        info!(pid = %pid, "Process killed");
        Ok(())
    }
}
