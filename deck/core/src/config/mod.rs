//! TOML Configuration File Support
//!
//! Centralized configuration loading for the deck daemon, with an optional
//! TOML file at `~/.config/deck/daemon.toml`.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. CLI arguments (applied through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:1958"
//! deck_dir = "/srv/decks"
//!
//! [viewer]
//! command = "vgdeck"
//! loop_flag = "-loop"
//!
//! [media]
//! command = "omxplayer"
//! args = ["-o", "both"]
//! ```
//!
//! # Environment Variables
//!
//! - `DECK_LISTEN`: listen address
//! - `DECK_DIR`: deck directory
//! - `DECK_VIEWER`: viewer program
//! - `DECK_MEDIA_PLAYER`: media player program

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controller::{ControllerConfig, MediaCommand, ViewerCommand};

/// Default HTTP listen address
pub const DEFAULT_LISTEN: &str = "0.0.0.0:1958";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the configuration last got a value from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[server]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// HTTP listen address
    pub listen: Option<String>,
    /// Directory holding decks and media
    pub deck_dir: Option<PathBuf>,
}

/// `[viewer]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerToml {
    /// Viewer program
    pub command: Option<String>,
    /// Flag passed before the duration
    pub loop_flag: Option<String>,
}

/// `[media]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaToml {
    /// Media player program
    pub command: Option<String>,
    /// Arguments passed before the file name
    pub args: Option<Vec<String>>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckToml {
    /// Server section
    pub server: ServerToml,
    /// Viewer section
    pub viewer: ViewerToml,
    /// Media section
    pub media: MediaToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved daemon configuration
#[derive(Clone, Debug)]
pub struct DeckConfig {
    /// HTTP listen address
    pub listen: String,
    /// Directory holding decks and media
    pub deck_dir: PathBuf,
    /// Viewer and media commands
    pub controller: ControllerConfig,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            deck_dir: PathBuf::from("."),
            controller: ControllerConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl DeckConfig {
    /// Where the most recent override came from
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Listen address, parsed
    ///
    /// A bare `:port` binds all interfaces.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ValidationError`] if the address does not parse.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = if self.listen.starts_with(':') {
            format!("0.0.0.0{}", self.listen)
        } else {
            self.listen.clone()
        };
        addr.parse().map_err(|e| {
            ConfigError::ValidationError(format!("listen address {:?}: {e}", self.listen))
        })
    }

    /// Check values that would only fail later at runtime
    ///
    /// # Errors
    ///
    /// [`ConfigError::ValidationError`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr()?;
        if self.controller.viewer.program.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "viewer command must not be empty".to_string(),
            ));
        }
        if self.controller.media.program.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "media command must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/deck/daemon.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("deck").join("daemon.toml"))
}

/// Load configuration from `path` (if it exists) plus environment
///
/// A missing file is not an error; defaults are used instead.
///
/// # Errors
///
/// [`ConfigError::ReadError`] or [`ConfigError::ParseError`].
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<DeckConfig, ConfigError> {
    let mut config = load_file(path)?;
    apply_env_config(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn load_file(path: Option<PathBuf>) -> Result<DeckConfig, ConfigError> {
    let mut config = DeckConfig::default();

    let Some(config_path) = path else {
        return Ok(config);
    };

    if !config_path.exists() {
        tracing::debug!(
            path = %config_path.display(),
            "Config file not found, using defaults"
        );
        return Ok(config);
    }

    let toml_content =
        std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
            path: config_path.clone(),
            source: e,
        })?;
    let toml_config: DeckToml = toml::from_str(&toml_content)?;
    apply_toml_config(&mut config, toml_config);
    config.config_file_path = Some(config_path.clone());
    config.source = ConfigSource::File;

    tracing::info!(
        path = %config_path.display(),
        "Loaded configuration from file"
    );
    Ok(config)
}

fn apply_toml_config(config: &mut DeckConfig, toml: DeckToml) {
    if let Some(listen) = toml.server.listen {
        config.listen = listen;
    }
    if let Some(dir) = toml.server.deck_dir {
        config.deck_dir = dir;
    }
    if let Some(command) = toml.viewer.command {
        config.controller.viewer.program = command;
    }
    if let Some(flag) = toml.viewer.loop_flag {
        config.controller.viewer.loop_flag = flag;
    }
    if let Some(command) = toml.media.command {
        config.controller.media.program = command;
    }
    if let Some(args) = toml.media.args {
        config.controller.media.args = args;
    }
}

fn apply_env_config(config: &mut DeckConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(listen) = var("DECK_LISTEN") {
        config.listen = listen;
        config.source = ConfigSource::Env;
    }
    if let Some(dir) = var("DECK_DIR") {
        config.deck_dir = PathBuf::from(dir);
        config.source = ConfigSource::Env;
    }
    if let Some(viewer) = var("DECK_VIEWER") {
        config.controller.viewer.program = viewer;
        config.source = ConfigSource::Env;
    }
    if let Some(player) = var("DECK_MEDIA_PLAYER") {
        config.controller.media.program = player;
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Overrides
// =============================================================================

/// Values supplied on the command line
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Listen address
    pub listen: Option<String>,
    /// Deck directory
    pub deck_dir: Option<PathBuf>,
    /// Viewer program
    pub viewer: Option<ViewerCommand>,
    /// Media player
    pub media: Option<MediaCommand>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set listen address override
    #[must_use]
    pub fn with_listen(mut self, listen: String) -> Self {
        self.listen = Some(listen);
        self
    }

    /// Set deck directory override
    #[must_use]
    pub fn with_deck_dir(mut self, dir: PathBuf) -> Self {
        self.deck_dir = Some(dir);
        self
    }

    /// Apply overrides on top of a loaded configuration
    pub fn apply(&self, config: &mut DeckConfig) {
        if let Some(ref listen) = self.listen {
            config.listen = listen.clone();
            config.source = ConfigSource::Cli;
        }
        if let Some(ref dir) = self.deck_dir {
            config.deck_dir = dir.clone();
            config.source = ConfigSource::Cli;
        }
        if let Some(ref viewer) = self.viewer {
            config.controller.viewer = viewer.clone();
            config.source = ConfigSource::Cli;
        }
        if let Some(ref media) = self.media {
            config.controller.media = media.clone();
            config.source = ConfigSource::Cli;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_toml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = DeckConfig::default();
        assert_eq!(config.listen, "0.0.0.0:1958");
        assert_eq!(config.deck_dir, PathBuf::from("."));
        assert_eq!(config.controller.viewer.program, "vgdeck");
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("deck/daemon.toml"));
        }
    }

    #[test]
    fn test_parse_valid_toml() {
        let file = write_toml(
            r#"
[server]
listen = "127.0.0.1:8080"
deck_dir = "/srv/decks"

[viewer]
command = "pdfdeck"
loop_flag = "--loop"

[media]
command = "mpv"
args = ["--fs"]
"#,
        );

        let config = load_file(Some(file.path().to_path_buf())).unwrap();

        assert_eq!(config.listen, "127.0.0.1:8080");
        assert_eq!(config.deck_dir, PathBuf::from("/srv/decks"));
        assert_eq!(config.controller.viewer.program, "pdfdeck");
        assert_eq!(config.controller.viewer.loop_flag, "--loop");
        assert_eq!(config.controller.media.program, "mpv");
        assert_eq!(config.controller.media.args, vec!["--fs"]);
        assert_eq!(config.source(), ConfigSource::File);
        assert_eq!(config.config_file_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_parse_partial_toml() {
        let file = write_toml("[viewer]\ncommand = \"other\"\n");

        let config = load_file(Some(file.path().to_path_buf())).unwrap();

        assert_eq!(config.controller.viewer.program, "other");
        assert_eq!(config.controller.viewer.loop_flag, "-loop");
        assert_eq!(config.listen, DEFAULT_LISTEN);
    }

    #[test]
    fn test_missing_file_graceful() {
        let config = load_file(Some(PathBuf::from("/nonexistent/deck/daemon.toml"))).unwrap();
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_malformed_toml_error() {
        let file = write_toml("[server\nlisten = ");

        let result = load_file(Some(file.path().to_path_buf()));

        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_env_overrides_file() {
        let file = write_toml("[server]\nlisten = \"127.0.0.1:1\"\n");
        let mut config = load_file(Some(file.path().to_path_buf())).unwrap();
        let env: HashMap<&str, &str> =
            HashMap::from([("DECK_LISTEN", "127.0.0.1:2"), ("DECK_VIEWER", "viewer2")]);

        apply_env_config(&mut config, |k| env.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.listen, "127.0.0.1:2");
        assert_eq!(config.controller.viewer.program, "viewer2");
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config = DeckConfig::default();
        apply_env_config(&mut config, |k| {
            (k == "DECK_DIR").then(|| "/from/env".to_string())
        });

        ConfigOverrides::new()
            .with_deck_dir(PathBuf::from("/from/cli"))
            .apply(&mut config);

        assert_eq!(config.deck_dir, PathBuf::from("/from/cli"));
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_listen_addr_accepts_bare_port() {
        let mut config = DeckConfig::default();
        config.listen = ":1958".to_string();
        assert_eq!(config.listen_addr().unwrap().port(), 1958);

        config.listen = "not an address".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_empty_viewer_rejected() {
        let mut config = DeckConfig::default();
        config.controller.viewer.program = " ".to_string();
        assert!(config.validate().is_err());
    }
}
