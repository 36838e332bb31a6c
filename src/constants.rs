//! Centralized constants for display geometry, limits and default timings.
//!
//! All magic numbers used by the board should be defined here so that the
//! limits enforced by the HTTP API, the registry and the schedulers agree.

use std::time::Duration;

// =============================================================================
// Display Geometry
// =============================================================================

/// Characters per display row (16x2 panel).
pub const DISPLAY_COLS: usize = 16;

/// Number of display rows.
pub const DISPLAY_ROWS: usize = 2;

/// Row used for the rotating service value.
pub const SERVICE_ROW: u8 = 0;

/// Row used for the system metrics line.
pub const STATS_ROW: u8 = 1;

// =============================================================================
// Registry Limits
// =============================================================================

/// Maximum service value length, in characters.
pub const MAX_VALUE_CHARS: usize = 100;

/// Maximum service name length.
pub const MAX_NAME_LEN: usize = 32;

/// Upper bound applied to expiry durations (one year). Longer sleeps are
/// beyond the range of the runtime's timer wheel.
pub const MAX_EXPIRY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

// =============================================================================
// Scheduler Defaults
// =============================================================================

/// Period of the metrics line refresh.
pub const STATS_TICK_INTERVAL_MS: u64 = 5000;

/// Time each scroll frame stays on screen.
pub const SCROLL_INTERVAL_MS: u64 = 500;

/// Pause between two rotation cycles.
pub const SERVICES_TICK_INTERVAL_MS: u64 = 3000;

/// Scroll frames are preceded by a hold of this many scroll intervals.
pub const SCROLL_LEAD_IN_FRAMES: u32 = 3;

/// Metrics writes allowed to wait in the print queue at the same time.
/// Further ticks are skipped until the queue drains.
pub const DEFAULT_MAX_PENDING_STATS_WRITES: usize = 2;

// =============================================================================
// Server Defaults
// =============================================================================

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8485;

/// Maximum request body size (16 KB). Values are at most 100 characters.
pub const MAX_BODY_SIZE_BYTES: usize = 16 * 1024;

// =============================================================================
// Hardware Defaults
// =============================================================================

/// Default HD44780 register-select GPIO.
pub const DEFAULT_LCD_RS: u32 = 24;

/// Default HD44780 enable GPIO.
pub const DEFAULT_LCD_E: u32 = 25;

/// Default HD44780 D4..D7 GPIOs.
pub const DEFAULT_LCD_DATA: [u32; 4] = [14, 15, 18, 23];

/// Default Linux thermal zone file (millidegrees Celsius).
pub const DEFAULT_THERMAL_ZONE_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";
