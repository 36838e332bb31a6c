//! Capability interfaces for the display and the metric sources.
//!
//! The board never talks to hardware directly: the print queue owns one
//! [`Display`] and the metrics scheduler samples one [`TemperatureSource`]
//! and one [`UsageSource`]. Implementations:
//!
//! - [`console::ConsoleDisplay`] - renders the 16x2 framebuffer to the log
//! - [`memory::MemoryDisplay`] - in-memory double for tests
//! - [`hd44780::Hd44780`] - 4-bit parallel driver over `embedded-hal` pins
//! - `gpio::open` - Linux sysfs GPIO binding (feature `gpio`)
//! - [`sensors`] - thermal zone / vcgencmd temperature, sysinfo CPU usage

use async_trait::async_trait;

use crate::config::{DisplayBackend, DisplaySettings, SensorSettings, TemperatureBackend};
use crate::constants::{DISPLAY_COLS, DISPLAY_ROWS};
use crate::error;

pub mod console;
#[cfg(feature = "gpio")]
pub mod gpio;
pub mod hd44780;
pub mod memory;
pub mod sensors;

pub use console::ConsoleDisplay;
pub use hd44780::{BlockingDisplay, CharacterLcd, Hd44780};
pub use memory::{DisplayLog, DisplayOp, MemoryDisplay};
pub use sensors::{FixedReading, SysinfoUsage, ThermalZoneTemperature, VcgencmdTemperature};

/// Errors reported by a display.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisplayError {
    /// A pin or bus operation failed.
    #[error("bus error: {0}")]
    Bus(String),
    /// Position outside the panel.
    #[error("position out of range: column {column}, row {row}")]
    OutOfRange { column: u8, row: u8 },
    /// The device was closed.
    #[error("display closed")]
    Closed,
    /// An earlier failure halted the print queue.
    #[error("print queue halted after earlier failure: {0}")]
    Halted(String),
}

/// Errors reported by a metric source.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// Reading the underlying file or command failed.
    #[error("sensor IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The source produced output that could not be parsed.
    #[error("unparsable sensor output: {0}")]
    Parse(String),
}

/// A two-line character display.
///
/// Implementations are driven exclusively by the print queue, so they never
/// see two calls at once.
#[async_trait]
pub trait Display: Send {
    /// Clear the entire screen.
    async fn clear(&mut self) -> Result<(), DisplayError>;

    /// Draw `text` starting at `column` on `row`.
    async fn write(&mut self, column: u8, row: u8, text: &str) -> Result<(), DisplayError>;

    /// Release the device. Called once on shutdown.
    async fn close(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}

/// Source of the SoC temperature in degrees Celsius.
#[async_trait]
pub trait TemperatureSource: Send + Sync {
    async fn read(&self) -> Result<f64, SensorError>;
}

/// Source of the CPU usage as a fraction in `[0, 1]` averaged over cores.
#[async_trait]
pub trait UsageSource: Send + Sync {
    async fn read(&self) -> Result<f64, SensorError>;

    /// Number of cores the fraction is averaged over.
    fn cores(&self) -> usize {
        1
    }
}

/// Opens the configured display backend.
///
/// # Errors
///
/// Returns `ConfigInvalid` for a bad pin layout or a backend this build
/// does not support, and `DeviceFailure` if the panel fails to initialize.
pub fn open_display(settings: &DisplaySettings) -> error::Result<Box<dyn Display>> {
    match settings.backend {
        DisplayBackend::Console => {
            tracing::info!("Using console display");
            Ok(Box::new(ConsoleDisplay::new()))
        },
        DisplayBackend::Hd44780 => open_hd44780(settings),
    }
}

#[cfg(feature = "gpio")]
fn open_hd44780(settings: &DisplaySettings) -> error::Result<Box<dyn Display>> {
    let pins = settings.pins()?;
    Ok(Box::new(gpio::open(&pins)?))
}

#[cfg(not(feature = "gpio"))]
fn open_hd44780(settings: &DisplaySettings) -> error::Result<Box<dyn Display>> {
    settings.pins()?;
    Err(error::Error::config(
        "display backend 'hd44780' needs a build with the `gpio` feature",
    ))
}

/// Builds the configured metric sources.
pub fn open_sensors(
    settings: &SensorSettings,
) -> (Box<dyn TemperatureSource>, Box<dyn UsageSource>) {
    let temperature: Box<dyn TemperatureSource> = match settings.temperature {
        TemperatureBackend::ThermalZone => {
            Box::new(ThermalZoneTemperature::new(settings.thermal_zone_path.clone()))
        },
        TemperatureBackend::Vcgencmd => Box::new(VcgencmdTemperature),
    };
    (temperature, Box::new(SysinfoUsage::new()))
}

/// Character contents of a 16x2 panel, as last written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    rows: [[char; DISPLAY_COLS]; DISPLAY_ROWS],
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self {
            rows: [[' '; DISPLAY_COLS]; DISPLAY_ROWS],
        }
    }
}

impl Framebuffer {
    /// Blank every cell.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Copy `text` into the buffer starting at the given cell. Characters
    /// past the right edge are dropped, like the panel itself does.
    pub fn write(&mut self, column: u8, row: u8, text: &str) -> Result<(), DisplayError> {
        let (col, row_idx) = (usize::from(column), usize::from(row));
        if col >= DISPLAY_COLS || row_idx >= DISPLAY_ROWS {
            return Err(DisplayError::OutOfRange { column, row });
        }
        for (cell, ch) in self.rows[row_idx][col..].iter_mut().zip(text.chars()) {
            *cell = ch;
        }
        Ok(())
    }

    /// Contents of one row.
    pub fn row(&self, row: usize) -> String {
        self.rows.get(row).map(|r| r.iter().collect()).unwrap_or_default()
    }

    /// Both rows, top first.
    pub fn lines(&self) -> [String; DISPLAY_ROWS] {
        [self.row(0), self.row(1)]
    }
}
