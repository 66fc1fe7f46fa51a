//! Configuration module for PidVis-RS
//!
//! This module handles two kinds of persisted data:
//! - [`AppConfig`] - user-editable settings (serial link, plot window, channels), stored as TOML
//! - [`AppState`] - what the tool remembers between runs (last port, recent ports), stored as JSON
//!
//! # Locations
//!
//! - Config: `<config dir>/dev.pidvis.pidvis-rs/config.toml`
//! - State: `<data dir>/dev.pidvis.pidvis-rs/app_state.json`
//!
//! where `<config dir>` / `<data dir>` are the platform directories reported by
//! `dirs_next` (e.g. `~/.config` and `~/.local/share` on Linux).
//!
//! # Example
//!
//! ```ignore
//! use pidvis_rs::config::{AppConfig, AppState};
//!
//! let config = AppConfig::load_or_default(None);
//! let mut state = AppState::load_or_default();
//!
//! state.record_connection(&config.serial.port, config.serial.baud_rate);
//! state.save()?;
//! ```

use crate::error::{PidVisError, Result, ResultExt};
use crate::series::{Channel, WindowSpec, WindowedSeriesStore, YRangeMode, DEFAULT_Y_MARGIN};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config and data directories
pub const APP_ID: &str = "dev.pidvis.pidvis-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Maximum number of recent ports to remember
pub const MAX_RECENT_PORTS: usize = 8;

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default sleep between empty reads in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5;

// ==================== Directories ====================

/// Directory holding `config.toml`
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Default path of the config file
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Directory holding `app_state.json`
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .map_err(PidVisError::from)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(PidVisError::from)
        .with_context(|| format!("Failed to read {}", path.display()))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    ensure_parent_dir(path)?;
    std::fs::write(path, contents)
        .map_err(PidVisError::from)
        .with_context(|| format!("Failed to write {}", path.display()))
}

// ==================== App Config ====================

/// Complete user configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Serial link settings
    #[serde(default)]
    pub serial: SerialConfig,

    /// Plot window settings
    #[serde(default)]
    pub plot: PlotConfig,

    /// Channels to plot, in display order
    #[serde(default = "Channel::all_fields")]
    pub channels: Vec<Channel>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            plot: PlotConfig::default(),
            channels: Channel::all_fields(),
        }
    }
}

impl AppConfig {
    /// Create a config with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| PidVisError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the config as TOML text
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PidVisError::Serialization(format!("Failed to serialize config: {}", e)))
    }

    /// Load a config file; `None` means the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path().ok_or_else(|| {
                PidVisError::Config("Could not determine config directory".to_string())
            })?,
        };

        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = read_file(&path)?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load a config, returning defaults on any error
    pub fn load_or_default(path: Option<&Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config as TOML; `None` means the default location
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path().ok_or_else(|| {
                PidVisError::Config("Could not determine config directory".to_string())
            })?,
        };
        write_file(&path, &self.to_toml()?)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        WindowSpec::new(self.plot.span_secs)?;
        if self.serial.baud_rate == 0 {
            return Err(PidVisError::Config("baud_rate must be non-zero".to_string()));
        }
        if self.serial.read_buffer_size == 0 || self.serial.channel_buffer_size == 0 {
            return Err(PidVisError::Config(
                "buffer sizes must be non-zero".to_string(),
            ));
        }
        let mut names: Vec<&str> = self.channels.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        if let Some(dup) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(PidVisError::Channel(format!(
                "Duplicate channel name '{}'",
                dup[0]
            )));
        }
        Ok(())
    }

    /// Build a stopped series store with this config's window and channels
    pub fn build_store(&self) -> Result<WindowedSeriesStore> {
        let mut store = WindowedSeriesStore::new(WindowSpec::new(self.plot.span_secs)?)
            .with_range_mode(self.plot.y_range_mode)
            .with_y_margin(self.plot.y_margin);
        for channel in &self.channels {
            if !store.add_channel(channel.clone()) {
                return Err(PidVisError::Channel(format!(
                    "Duplicate channel name '{}'",
                    channel.name
                )));
            }
        }
        Ok(store)
    }
}

// ==================== Serial Config ====================

/// Serial link configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port name (e.g. "/dev/ttyUSB0", "COM3", or "sim://pid"); empty = not chosen
    pub port: String,

    /// Baud rate
    pub baud_rate: u32,

    /// Sleep between reads that returned no bytes, in milliseconds
    pub poll_interval_ms: u64,

    /// Bytes requested per read
    pub read_buffer_size: usize,

    /// Capacity of the backend → consumer message queue
    pub channel_buffer_size: usize,

    /// Timeout for opening and reading the port, in milliseconds
    pub open_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            read_buffer_size: 256,
            channel_buffer_size: 1024,
            open_timeout_ms: 100,
        }
    }
}

// ==================== Plot Config ====================

/// Plot window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Width of the trailing window in seconds
    pub span_secs: f64,

    /// How the Y range is derived
    pub y_range_mode: YRangeMode,

    /// Relative padding on both ends of the Y range
    pub y_margin: f64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            span_secs: WindowSpec::default().span_secs(),
            y_range_mode: YRangeMode::default(),
            y_margin: DEFAULT_Y_MARGIN,
        }
    }
}

// ==================== Recent Port Entry ====================

/// A port that was connected to before
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentPort {
    /// Port name
    pub name: String,

    /// Baud rate used last time
    pub baud_rate: u32,

    /// When the port was last connected
    pub last_used: DateTime<Utc>,
}

impl RecentPort {
    pub fn new(name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            name: name.into(),
            baud_rate,
            last_used: Utc::now(),
        }
    }
}

// ==================== App State ====================

/// Persistent application state
///
/// Remembers connection history across runs, separate from the
/// user-edited config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    /// Version for future migration support
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Last port successfully connected to
    #[serde(default)]
    pub last_port: Option<String>,

    /// Baud rate used with `last_port`
    #[serde(default)]
    pub last_baud_rate: Option<u32>,

    /// Recently used ports, most recent first
    #[serde(default)]
    pub recent_ports: Vec<RecentPort>,
}

fn default_app_state_version() -> u32 {
    1
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            last_port: None,
            last_baud_rate: None,
            recent_ports: Vec::new(),
        }
    }
}

impl AppState {
    /// Load app state from the default location
    pub fn load() -> Result<Self> {
        let path = app_state_path().ok_or_else(|| {
            PidVisError::Config("Could not determine app state path".to_string())
        })?;
        Self::load_from(&path)
    }

    /// Load app state from a specific file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = read_file(path)?;

        serde_json::from_str(&content)
            .map_err(|e| PidVisError::Config(format!("Failed to parse app state: {}", e)))
    }

    /// Load app state, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load app state, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save app state to the default location
    pub fn save(&self) -> Result<()> {
        let path = app_state_path().ok_or_else(|| {
            PidVisError::Config("Could not determine app state path".to_string())
        })?;
        self.save_to(&path)
    }

    /// Save app state to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            PidVisError::Serialization(format!("Failed to serialize app state: {}", e))
        })?;
        write_file(path, &content)
    }

    /// Remember a successful connection
    pub fn record_connection(&mut self, port: &str, baud_rate: u32) {
        self.recent_ports.retain(|p| p.name != port);
        self.recent_ports.insert(0, RecentPort::new(port, baud_rate));
        self.recent_ports.truncate(MAX_RECENT_PORTS);

        self.last_port = Some(port.to_string());
        self.last_baud_rate = Some(baud_rate);
    }

    /// Forget a port (e.g. the adapter was unplugged for good)
    pub fn forget_port(&mut self, port: &str) {
        self.recent_ports.retain(|p| p.name != port);
        if self.last_port.as_deref() == Some(port) {
            self.last_port = None;
            self.last_baud_rate = None;
        }
    }
}

// ==================== Tests ====================
