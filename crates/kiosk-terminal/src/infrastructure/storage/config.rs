//! TOML-based configuration for the kiosk terminal.
//!
//! Reads `KioskConfig` from `$XDG_CONFIG_HOME/kiosk-terminal/config.toml`
//! (falling back to `~/.config/kiosk-terminal/config.toml`), or from an
//! explicit path given on the command line.
//!
//! ```toml
//! [kiosk]
//! log_level = "info"
//! lock_keyboard_on_start = true
//!
//! [terminal]
//! id = "T-0042"
//! base_url = "https://pnr.example"
//! session = "CASH_17"
//!
//! [input]
//! display_server = "wayland"
//! keycode_offset = 1
//!
//! [browser]
//! devtools_url = "ws://127.0.0.1:9222/devtools/page/ABC"
//!
//! [[denominations]]
//! amount = 2
//! keys = ["2", "kp_2"]
//! ```
//!
//! Every section and field is optional.  An absent `[[denominations]]` list
//! means the built-in BRL table.

use std::path::{Path, PathBuf};

use kiosk_core::{DenominationBinding, DenominationError, DenominationTable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configured denominations are inconsistent.
    #[error("invalid denominations: {0}")]
    Denominations(#[from] DenominationError),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level terminal configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KioskConfig {
    pub kiosk: KioskSection,
    pub terminal: TerminalSection,
    pub input: InputSection,
    pub browser: BrowserSection,
    /// Empty means the built-in BRL table.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub denominations: Vec<DenominationBinding>,
}

/// Process behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KioskSection {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Disable Alt+F4 before input capture starts.
    #[serde(default = "default_true")]
    pub lock_keyboard_on_start: bool,
}

/// Terminal identity and backend location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TerminalSection {
    #[serde(default)]
    pub id: String,
    /// Backend origin, e.g. `https://pnr.example`.  Empty disables deposit
    /// submission.
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_deposit_path")]
    pub deposit_path: String,
    /// Session id as stored for the terminal, e.g. `PIX_1234`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

/// Input backend overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InputSection {
    /// `"x11"` or `"wayland"`; detected from the environment when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_server: Option<String>,
    /// Correction applied to hook top-row key codes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keycode_offset: Option<i32>,
}

/// Browser attachment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BrowserSection {
    /// DevTools page websocket.  Absent means scripts are only logged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devtools_url: Option<String>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_deposit_path() -> String {
    "/api/hooks/pnr/deposit_cash".to_string()
}

impl Default for KioskSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            lock_keyboard_on_start: default_true(),
        }
    }
}

impl Default for TerminalSection {
    fn default() -> Self {
        Self {
            id: String::new(),
            base_url: String::new(),
            deposit_path: default_deposit_path(),
            session: None,
        }
    }
}

impl KioskConfig {
    /// The validated denomination table: the configured bindings, or the
    /// built-in BRL table when none are configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Denominations`] when the configured bindings
    /// overlap or are empty.
    pub fn denomination_table(&self) -> Result<DenominationTable, ConfigError> {
        if self.denominations.is_empty() {
            return Ok(DenominationTable::default_brl());
        }
        Ok(DenominationTable::new(self.denominations.clone())?)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default config file path.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if neither `XDG_CONFIG_HOME`
/// nor `HOME` is set.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the config from `path`, or from [`config_file_path`] when `None`.
/// A missing file yields `KioskConfig::default()`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<KioskConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    load_config_from(&path)
}

fn load_config_from(path: &Path) -> Result<KioskConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(KioskConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// `$XDG_CONFIG_HOME/kiosk-terminal` or `~/.config/kiosk-terminal`.
fn platform_config_dir() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(base.join("kiosk-terminal"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
