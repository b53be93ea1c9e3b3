//! Deck Core - Presentation Control for the deck daemon
//!
//! This crate holds everything the deck daemon does besides speaking HTTP:
//! running exactly one presentation viewer at a time, playing media, managing
//! the deck directory and turning tab-separated tables into deck markup.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    deck-daemon (HTTP)                        │
//! └───────┬──────────────────────┬───────────────────┬───────────┘
//!         │ start / stop / media │ list / upload /   │ table
//!         │                      │ delete            │
//! ┌───────▼────────┐     ┌───────▼───────┐   ┌───────▼────────┐
//! │ DeckController │     │  DeckLibrary  │   │  TableLayout   │
//! │  Idle ⇄ Active │     │ (deck dir)    │   │ (tsv → markup) │
//! └───────┬────────┘     └───────────────┘   └────────────────┘
//!         │ spawn / kill
//! ┌───────▼─────────┐
//! │ ProcessLauncher │  SystemLauncher (tokio::process) or a test fake
//! └─────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use deck_core::{ControllerConfig, DeckController, SystemLauncher};
//!
//! let controller = DeckController::new(Arc::new(SystemLauncher::new()), ControllerConfig::default());
//! let started = controller.start("demo.xml", "5").await?;
//! println!("viewer pid {}", started.pid);
//! controller.stop().await?;
//! ```
//!
//! # Module Overview
//!
//! - [`controller`]: the presentation state machine
//! - [`launcher`]: process spawning capability
//! - [`table`]: table layout generator
//! - [`library`]: deck directory operations
//! - [`config`]: TOML / environment configuration
//! - [`error`]: controller errors
//! - [`test_utils`]: recording launcher for tests

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod controller;
pub mod error;
pub mod launcher;
pub mod library;
pub mod table;
pub mod test_utils;

pub use config::{
    default_config_path, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, DeckConfig,
};
pub use controller::{
    ControllerConfig, DeckController, DeckStatus, MediaCommand, MediaStarted, Started, Stopped,
    ViewerCommand,
};
pub use error::DeckError;
pub use launcher::{LaunchError, ProcessId, ProcessLauncher, SystemLauncher};
pub use library::{sanitize_name, DeckEntry, DeckLibrary, LibraryError};
pub use table::{generate, LayoutColumn, TableError, TableLayout, TableStyle, TableSummary};
