//! Board configuration.
//!
//! Loaded once at startup from the file given on the command line. TOML is
//! the native format; files ending in `.json` are read in the flat legacy
//! format (`host`, `port`, `rs`, `e`, `data`).
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8485
//!
//! [display]
//! backend = "hd44780"
//! rs = 24
//! e = 25
//! data = [14, 15, 18, 23]
//!
//! [sensors]
//! temperature = "vcgencmd"
//!
//! [board]
//! stats_interval_ms = 5000
//! scroll_interval_ms = 500
//! rotation_interval_ms = 3000
//! max_pending_stats_writes = 2
//!
//! [logging]
//! format = "json"
//! level = "info"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    DEFAULT_HOST, DEFAULT_LCD_DATA, DEFAULT_LCD_E, DEFAULT_LCD_RS,
    DEFAULT_MAX_PENDING_STATS_WRITES, DEFAULT_PORT, DEFAULT_THERMAL_ZONE_PATH,
    SCROLL_INTERVAL_MS, SERVICES_TICK_INTERVAL_MS, STATS_TICK_INTERVAL_MS,
};
use crate::error::{Error, Result};
use crate::logging::LogFormat;

/// Complete board configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    /// HTTP listener settings.
    pub server: ServerSettings,
    /// Display backend and wiring.
    pub display: DisplaySettings,
    /// Metric sources.
    pub sensors: SensorSettings,
    /// Scheduler timings.
    pub board: BoardSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Which display implementation drives the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayBackend {
    /// Render to the log.
    #[default]
    Console,
    /// HD44780 panel on GPIO (requires the `gpio` feature).
    Hd44780,
}

/// Display settings. Pin fields are all given or all omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub backend: DisplayBackend,
    pub rs: Option<u32>,
    pub e: Option<u32>,
    pub data: Option<Vec<u32>>,
}

/// Validated HD44780 wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcdPins {
    pub rs: u32,
    pub e: u32,
    /// D4..D7.
    pub data: [u32; 4],
}

impl Default for LcdPins {
    fn default() -> Self {
        Self {
            rs: DEFAULT_LCD_RS,
            e: DEFAULT_LCD_E,
            data: DEFAULT_LCD_DATA,
        }
    }
}

impl DisplaySettings {
    /// Resolves the wiring, falling back to the default pins when none are
    /// configured.
    pub fn pins(&self) -> Result<LcdPins> {
        match (self.rs, self.e, self.data.as_deref()) {
            (None, None, None) => Ok(LcdPins::default()),
            (Some(rs), Some(e), Some(data)) => {
                let data: [u32; 4] = data.try_into().map_err(|_| {
                    Error::config(format!(
                        "display.data must list exactly 4 pins, got {}",
                        data.len()
                    ))
                })?;
                Ok(LcdPins { rs, e, data })
            },
            _ => Err(Error::config(
                "LCD configuration is invalid: rs, e and data must be set together",
            )),
        }
    }
}

/// Which temperature source feeds the stats line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemperatureBackend {
    #[default]
    ThermalZone,
    Vcgencmd,
}

/// Metric source settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    pub temperature: TemperatureBackend,
    pub thermal_zone_path: PathBuf,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            temperature: TemperatureBackend::default(),
            thermal_zone_path: PathBuf::from(DEFAULT_THERMAL_ZONE_PATH),
        }
    }
}

/// Scheduler timings and queue limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    /// Period of the stats line refresh.
    pub stats_interval_ms: u64,
    /// Time each scroll frame is shown.
    pub scroll_interval_ms: u64,
    /// Pause between rotation cycles.
    pub rotation_interval_ms: u64,
    /// Stats writes allowed in the print queue at once.
    pub max_pending_stats_writes: usize,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            stats_interval_ms: STATS_TICK_INTERVAL_MS,
            scroll_interval_ms: SCROLL_INTERVAL_MS,
            rotation_interval_ms: SERVICES_TICK_INTERVAL_MS,
            max_pending_stats_writes: DEFAULT_MAX_PENDING_STATS_WRITES,
        }
    }
}

impl BoardSettings {
    pub const fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }

    pub const fn scroll_interval(&self) -> Duration {
        Duration::from_millis(self.scroll_interval_ms)
    }

    pub const fn rotation_interval(&self) -> Duration {
        Duration::from_millis(self.rotation_interval_ms)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("stats_interval_ms", self.stats_interval_ms),
            ("scroll_interval_ms", self.scroll_interval_ms),
            ("rotation_interval_ms", self.rotation_interval_ms),
        ] {
            if value == 0 {
                return Err(Error::config(format!("board.{field} must be greater than 0")));
            }
        }
        if self.max_pending_stats_writes == 0 {
            return Err(Error::config(
                "board.max_pending_stats_writes must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormat,
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: "info".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Parsed log level.
    pub fn level(&self) -> Result<tracing::Level> {
        self.level
            .parse()
            .map_err(|_| Error::config(format!("logging.level '{}' is not a level", self.level)))
    }
}

/// Flat configuration format of the original JSON config files.
#[derive(Debug, Deserialize)]
struct LegacyConfig {
    host: Option<String>,
    port: Option<u16>,
    rs: Option<u32>,
    e: Option<u32>,
    data: Option<Vec<u32>>,
}

impl From<LegacyConfig> for BoardConfig {
    fn from(legacy: LegacyConfig) -> Self {
        let mut config = Self::default();
        if let Some(host) = legacy.host {
            config.server.host = host;
        }
        if let Some(port) = legacy.port {
            config.server.port = port;
        }
        config.display.rs = legacy.rs;
        config.display.e = legacy.e;
        config.display.data = legacy.data;
        config
    }
}

impl BoardConfig {
    /// Loads and validates the configuration.
    ///
    /// Without a path the defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            tracing::debug!("No config file given, using defaults");
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading config {}", path.display()), e))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };

        tracing::info!(
            path = %path.display(),
            host = %config.server.host,
            port = config.server.port,
            backend = ?config.display.backend,
            "Loaded board configuration"
        );
        Ok(config)
    }

    /// Parses and validates TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::config(format!("failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates the flat JSON format.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let legacy: LegacyConfig = serde_json::from_str(content)
            .map_err(|e| Error::config(format!("failed to parse JSON: {e}")))?;
        let config = Self::from(legacy);
        config.validate()?;
        Ok(config)
    }

    /// Checks every field the board relies on.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::config("server.host must not be empty"));
        }
        self.display.pins()?;
        self.board.validate()?;
        self.logging.level()?;
        Ok(())
    }
}
