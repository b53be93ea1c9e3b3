//! Launcher Test Utilities
//!
//! Provides a [`RecordingLauncher`] that never touches the OS. It hands out
//! sequential fake pids, records every spawn and kill, and can be told to fail
//! so controller error paths can be exercised deterministically.
//!
//! # Usage
//!
//! ```ignore
//! use deck_core::test_utils::RecordingLauncher;
//!
//! let launcher = Arc::new(RecordingLauncher::new());
//! let controller = DeckController::new(launcher.clone(), ControllerConfig::default());
//!
//! controller.start("demo.xml", "5").await?;
//! assert_eq!(launcher.spawn_count(), 1);
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::launcher::{LaunchError, ProcessId, ProcessLauncher};

/// One recorded `spawn` call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnRecord {
    /// Program name as passed to the launcher
    pub program: String,
    /// Arguments in order
    pub args: Vec<String>,
    /// Pid handed back
    pub pid: ProcessId,
    /// Spawned through `spawn_detached`
    pub detached: bool,
}

/// In-memory launcher for tests
pub struct RecordingLauncher {
    next_pid: AtomicU32,
    spawns: Mutex<Vec<SpawnRecord>>,
    kills: Mutex<Vec<ProcessId>>,
    alive: Mutex<HashSet<ProcessId>>,
    fail_spawn: AtomicBool,
    fail_kill: AtomicBool,
    yields: u32,
}

impl Default for RecordingLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingLauncher {
    /// Create a launcher whose first pid is 1000
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_pid: AtomicU32::new(1000),
            spawns: Mutex::new(Vec::new()),
            kills: Mutex::new(Vec::new()),
            alive: Mutex::new(HashSet::new()),
            fail_spawn: AtomicBool::new(false),
            fail_kill: AtomicBool::new(false),
            yields: 0,
        }
    }

    /// Yield to the scheduler this many times inside every spawn
    ///
    /// Widens the window in which concurrent callers could interleave.
    #[must_use]
    pub fn with_yields(mut self, yields: u32) -> Self {
        self.yields = yields;
        self
    }

    /// Make subsequent spawns fail (or succeed again)
    pub fn set_fail_spawn(&self, fail: bool) {
        self.fail_spawn.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent kills fail (or succeed again)
    pub fn set_fail_kill(&self, fail: bool) {
        self.fail_kill.store(fail, Ordering::SeqCst);
    }

    /// Forget a pid as if the process had exited on its own
    pub fn forget(&self, pid: ProcessId) {
        self.alive.lock().remove(&pid);
    }

    /// All successful spawns, oldest first
    #[must_use]
    pub fn spawns(&self) -> Vec<SpawnRecord> {
        self.spawns.lock().clone()
    }

    /// Number of successful spawns
    #[must_use]
    pub fn spawn_count(&self) -> usize {
        self.spawns.lock().len()
    }

    /// All successful kills, oldest first
    #[must_use]
    pub fn kills(&self) -> Vec<ProcessId> {
        self.kills.lock().clone()
    }

    /// Whether a pid is currently considered running (and killable)
    #[must_use]
    pub fn is_alive(&self, pid: ProcessId) -> bool {
        self.alive.lock().contains(&pid)
    }

    async fn record_spawn(
        &self,
        program: &str,
        args: &[String],
        detached: bool,
    ) -> Result<ProcessId, LaunchError> {
        for _ in 0..self.yields {
            tokio::task::yield_now().await;
        }

        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(LaunchError::Spawn {
                program: program.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "simulated spawn failure"),
            });
        }

        let pid = ProcessId(self.next_pid.fetch_add(1, Ordering::SeqCst));
        if !detached {
            self.alive.lock().insert(pid);
        }
        self.spawns.lock().push(SpawnRecord {
            program: program.to_string(),
            args: args.to_vec(),
            pid,
            detached,
        });
        Ok(pid)
    }
}

#[async_trait]
impl ProcessLauncher for RecordingLauncher {
    async fn spawn(&self, program: &str, args: &[String]) -> Result<ProcessId, LaunchError> {
        self.record_spawn(program, args, false).await
    }

    async fn spawn_detached(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<ProcessId, LaunchError> {
        self.record_spawn(program, args, true).await
    }

    async fn kill(&self, pid: ProcessId) -> Result<(), LaunchError> {
        if !self.alive.lock().contains(&pid) {
            return Err(LaunchError::NotFound(pid));
        }

        if self.fail_kill.load(Ordering::SeqCst) {
            return Err(LaunchError::Kill {
                pid,
                source: std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "simulated kill failure",
                ),
            });
        }

        self.alive.lock().remove(&pid);
        self.kills.lock().push(pid);
        Ok(())
    }
}
