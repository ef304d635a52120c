//! TOML-based configuration for the client application.
//!
//! Reads and writes `ClientConfig` to `client.toml` in the
//! platform-appropriate config directory:
//! - Windows:  `%APPDATA%\Meeple\client.toml`
//! - Linux:    `~/.config/meeple/client.toml`
//! - macOS:    `~/Library/Application Support/Meeple/client.toml`
//!
//! ```toml
//! [ui]
//! locale = "en_US"
//! confirm_game_close = true
//! play_beep = true
//! log_level = "info"
//!
//! [players]
//! nickname = "player"
//! colors = ["#FF0000", "green", "#0000FF", "yellow", "black", "gray"]
//!
//! [server]
//! port = 37447
//! connect_timeout_ms = 5000
//!
//! [debug]
//! save_format = "gzip"
//! ```
//!
//! Every field has a default, so a missing file or section is not an error.
//! Values are checked once, by [`ClientConfig::session_settings`], before the
//! session starts; a bad colour or locale stops the client there.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use meeple_core::{
    domain::game::{DEFAULT_SLOT_COUNT, DEFAULT_TURN_LIMIT},
    ColorError, PlayerPalette, SnapshotEncoding, DEFAULT_PORT,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::session::SessionSettings;

/// Errors from reading, writing or validating `client.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `APPDATA`, `XDG_CONFIG_HOME` nor `HOME` is set.
    #[error("no configuration directory for this platform")]
    NoPlatformConfigDir,

    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot write configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid player colour: {0}")]
    InvalidColor(#[from] ColorError),

    #[error("invalid locale {0:?}; expected a language code such as \"en\" or \"en_US\"")]
    InvalidLocale(String),
}

// ── Schema ────────────────────────────────────────────────────────────────────

/// Top-level client configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub players: PlayersConfig,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub debug: DebugConfig,
}

/// User interface behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiConfig {
    /// `language` or `language_COUNTRY`; the system default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Ask before closing a game that is still in progress.
    #[serde(default = "default_true")]
    pub confirm_game_close: bool,
    /// Beep when it becomes this player's turn.
    #[serde(default = "default_true")]
    pub play_beep: bool,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Identity and display colours.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayersConfig {
    #[serde(default = "default_nickname")]
    pub nickname: String,
    /// Seat colours in seat order; `#RRGGBB` or a colour name.
    #[serde(default = "default_colors")]
    pub colors: Vec<String>,
}

/// Hosting and connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    /// Port a hosted game listens on, and the default port to join.
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Seats in a newly hosted game.
    #[serde(default = "default_slots")]
    pub slots: usize,
    /// Turns before a hosted game ends; `0` for no limit.
    #[serde(default = "default_turn_limit")]
    pub turn_limit: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DebugConfig {
    /// Encoding used when saving games.
    #[serde(default)]
    pub save_format: SnapshotEncoding,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_nickname() -> String {
    "player".to_string()
}
fn default_colors() -> Vec<String> {
    ["#FF0000", "green", "#0000FF", "yellow", "black", "gray"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_slots() -> usize {
    DEFAULT_SLOT_COUNT
}
fn default_turn_limit() -> u32 {
    DEFAULT_TURN_LIMIT
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            locale: None,
            confirm_game_close: default_true(),
            play_beep: default_true(),
            log_level: default_log_level(),
        }
    }
}

impl Default for PlayersConfig {
    fn default() -> Self {
        Self {
            nickname: default_nickname(),
            colors: default_colors(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            slots: default_slots(),
            turn_limit: default_turn_limit(),
        }
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

/// A parsed `language[_COUNTRY]` locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    pub language: String,
    pub country: Option<String>,
}

impl FromStr for Locale {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidLocale(s.to_string());
        let (language, country) = match s.split_once(&['_', '-'][..]) {
            Some((language, country)) => (language, Some(country)),
            None => (s, None),
        };
        let language_ok = (2..=3).contains(&language.len())
            && language.chars().all(|c| c.is_ascii_alphabetic());
        if !language_ok {
            return Err(invalid());
        }
        let country = match country {
            Some(c) if c.len() == 2 && c.chars().all(|c| c.is_ascii_alphabetic()) => {
                Some(c.to_ascii_uppercase())
            }
            Some(_) => return Err(invalid()),
            None => None,
        };
        Ok(Self {
            language: language.to_ascii_lowercase(),
            country,
        })
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.country {
            Some(country) => write!(f, "{}_{country}", self.language),
            None => f.write_str(&self.language),
        }
    }
}

impl ClientConfig {
    /// The configured locale, if any.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidLocale`] for a malformed string.
    pub fn locale(&self) -> Result<Option<Locale>, ConfigError> {
        self.ui.locale.as_deref().map(str::parse::<Locale>).transpose()
    }

    /// Resolves the seat colours.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidColor`] for an unknown name, bad hex, or an
    /// empty list.
    pub fn palette(&self) -> Result<PlayerPalette, ConfigError> {
        Ok(PlayerPalette::from_names(&self.players.colors)?)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.server.connect_timeout_ms)
    }

    /// Validates the configuration and builds what the session controller
    /// reads.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidColor`] or [`ConfigError::InvalidLocale`].
    pub fn session_settings(&self) -> Result<SessionSettings, ConfigError> {
        self.locale()?;
        Ok(SessionSettings {
            nickname: self.players.nickname.clone(),
            confirm_game_close: self.ui.confirm_game_close,
            play_beep: self.ui.play_beep,
            server_port: self.server.port,
            save_encoding: self.debug.save_format,
            palette: self.palette()?,
            slot_count: self.server.slots,
            turn_limit: self.server.turn_limit,
        })
    }
}

// ── Load and save ─────────────────────────────────────────────────────────────

/// Directory holding `client.toml`.
///
/// # Errors
///
/// [`ConfigError::NoPlatformConfigDir`].
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Full path of `client.toml`.
///
/// # Errors
///
/// [`ConfigError::NoPlatformConfigDir`].
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("client.toml"))
}

/// Loads `ClientConfig` from the platform config file.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `ClientConfig` from `path`, returning `ClientConfig::default()` if
/// the file does not exist.
///
/// # Errors
///
/// [`ConfigError::Io`] unless the file is simply missing, or
/// [`ConfigError::Parse`].
pub fn load_config_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to the platform config file.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &ClientConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_file_path()?)
}

/// Persists `config` to `path`, creating the directory if needed.
///
/// # Errors
///
/// [`ConfigError::Io`] or [`ConfigError::Serialize`].
pub fn save_config_to(config: &ClientConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the `Meeple`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Meeple"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("meeple"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Meeple")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
