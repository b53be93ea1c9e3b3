//! Deck Controller - The Presentation Lifecycle
//!
//! The controller owns the single "active presentation" slot of the daemon.
//! It starts the viewer for a deck, stops it again, and refuses anything that
//! would leave two viewers on screen.
//!
//! # State Machine
//!
//! ```text
//!            start (spawn ok)
//!     ┌──────┐ ───────────────▶ ┌────────┐
//!     │ Idle │                  │ Active │
//!     └──────┘ ◀─────────────── └────────┘
//!              stop (kill ok)
//! ```
//!
//! `start` while `Active` fails with [`DeckError::AlreadyRunning`] and `stop`
//! while `Idle` fails with [`DeckError::NotRunning`]. A failed spawn stays
//! `Idle`; a failed kill stays `Active`.
//!
//! # Concurrency
//!
//! Requests arrive on independent tasks. The check, the launcher call and the
//! state update of `start`/`stop` all happen while holding one async mutex,
//! so two concurrent `start` calls can never both spawn a viewer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::DeckError;
use crate::launcher::{ProcessId, ProcessLauncher};

/// Command line of the presentation viewer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewerCommand {
    /// Program to run
    pub program: String,
    /// Flag placed before the duration argument
    pub loop_flag: String,
}

impl Default for ViewerCommand {
    fn default() -> Self {
        Self {
            program: "vgdeck".to_string(),
            loop_flag: "-loop".to_string(),
        }
    }
}

/// Command line of the media player
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaCommand {
    /// Program to run
    pub program: String,
    /// Arguments placed before the media file name
    pub args: Vec<String>,
}

impl Default for MediaCommand {
    fn default() -> Self {
        Self {
            program: "omxplayer".to_string(),
            args: vec!["-o".to_string(), "both".to_string()],
        }
    }
}

/// Controller configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Viewer used for decks
    pub viewer: ViewerCommand,
    /// Player used for media files
    pub media: MediaCommand,
}

/// Presentation slot
#[derive(Clone, Debug)]
enum DeckState {
    Idle,
    Active {
        pid: ProcessId,
        deck: String,
        duration: String,
        started_at: DateTime<Utc>,
    },
}

/// Result of a successful `start`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Started {
    /// Pid of the viewer
    pub pid: ProcessId,
    /// Deck being shown
    pub deck: String,
    /// Duration token forwarded to the viewer
    pub duration: String,
}

/// Result of a successful `stop`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Stopped {
    /// Pid of the viewer that was terminated
    pub pid: ProcessId,
}

/// Result of a successful `play_media`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MediaStarted {
    /// Pid of the media player
    pub pid: ProcessId,
    /// Media file being played
    pub media: String,
}

/// Point-in-time view of the controller
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeckStatus {
    /// Whether a presentation is active
    pub running: bool,
    /// Viewer pid, present iff `running`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<ProcessId>,
    /// Active deck
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deck: Option<String>,
    /// Active duration token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// When the active presentation was started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl DeckStatus {
    fn from_state(state: &DeckState) -> Self {
        match state {
            DeckState::Idle => Self {
                running: false,
                pid: None,
                deck: None,
                duration: None,
                started_at: None,
            },
            DeckState::Active {
                pid,
                deck,
                duration,
                started_at,
            } => Self {
                running: true,
                pid: Some(*pid),
                deck: Some(deck.clone()),
                duration: Some(duration.clone()),
                started_at: Some(*started_at),
            },
        }
    }
}

/// Owner of the single active presentation
pub struct DeckController {
    launcher: Arc<dyn ProcessLauncher>,
    config: ControllerConfig,
    state: Mutex<DeckState>,
}

impl DeckController {
    /// Create an idle controller
    pub fn new(launcher: Arc<dyn ProcessLauncher>, config: ControllerConfig) -> Self {
        Self {
            launcher,
            config,
            state: Mutex::new(DeckState::Idle),
        }
    }

    /// Start the viewer for `deck`, passing `duration` through verbatim
    ///
    /// # Errors
    ///
    /// [`DeckError::EmptyDeckName`], [`DeckError::AlreadyRunning`] or
    /// [`DeckError::Spawn`]. None of them change the state.
    pub async fn start(&self, deck: &str, duration: &str) -> Result<Started, DeckError> {
        if deck.is_empty() {
            return Err(DeckError::EmptyDeckName);
        }

        let mut state = self.state.lock().await;
        if let DeckState::Active { pid, .. } = &*state {
            warn!(pid = %pid, deck = deck, "Start rejected, deck already running");
            return Err(DeckError::AlreadyRunning { pid: *pid });
        }

        let viewer = &self.config.viewer;
        let args = [
            viewer.loop_flag.clone(),
            duration.to_string(),
            deck.to_string(),
        ];
        let pid = self
            .launcher
            .spawn(&viewer.program, &args)
            .await
            .map_err(DeckError::Spawn)?;

        *state = DeckState::Active {
            pid,
            deck: deck.to_string(),
            duration: duration.to_string(),
            started_at: Utc::now(),
        };
        info!(pid = %pid, deck = deck, duration = duration, "Deck started");

        Ok(Started {
            pid,
            deck: deck.to_string(),
            duration: duration.to_string(),
        })
    }

    /// Terminate the active viewer
    ///
    /// # Errors
    ///
    /// [`DeckError::NotRunning`] when idle. [`DeckError::Lookup`] or
    /// [`DeckError::Kill`] when the launcher fails; the controller then stays
    /// active.
    pub async fn stop(&self) -> Result<Stopped, DeckError> {
        let mut state = self.state.lock().await;
        let DeckState::Active { pid, .. } = &*state else {
            return Err(DeckError::NotRunning);
        };
        let pid = *pid;

        self.launcher
            .kill(pid)
            .await
            .map_err(DeckError::from_kill)?;

        *state = DeckState::Idle;
        info!(pid = %pid, "Deck stopped");
        Ok(Stopped { pid })
    }

    /// Snapshot of the presentation slot
    pub async fn status(&self) -> DeckStatus {
        DeckStatus::from_state(&*self.state.lock().await)
    }

    /// Whether a presentation is active
    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, DeckState::Active { .. })
    }

    /// Play a media file with the configured player
    ///
    /// Fire-and-forget; the presentation slot is untouched.
    ///
    /// # Errors
    ///
    /// [`DeckError::EmptyMediaName`] or [`DeckError::Spawn`].
    pub async fn play_media(&self, media: &str) -> Result<MediaStarted, DeckError> {
        if media.is_empty() {
            return Err(DeckError::EmptyMediaName);
        }

        let player = &self.config.media;
        let mut args = player.args.clone();
        args.push(media.to_string());

        let pid = self
            .launcher
            .spawn_detached(&player.program, &args)
            .await
            .map_err(DeckError::Spawn)?;

        info!(pid = %pid, media = media, "Media started");
        Ok(MediaStarted {
            pid,
            media: media.to_string(),
        })
    }

    /// Stop the active presentation, if any, before the daemon exits
    pub async fn shutdown(&self) -> Option<Stopped> {
        match self.stop().await {
            Ok(stopped) => Some(stopped),
            Err(DeckError::NotRunning) => None,
            Err(e) => {
                warn!(error = %e, "Failed to stop deck during shutdown");
                None
            }
        }
    }
}
