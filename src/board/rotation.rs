//! Rotation of service values on the top row.
//!
//! A cycle advances the registry cursor and shows the value under it. Values
//! longer than the panel are held briefly, then scrolled one character per
//! frame until the last 16 characters are visible. The next cycle starts one
//! rotation interval after the previous one finished, so cycles never
//! overlap.

use std::time::Duration;
use tokio::sync::watch;

use super::registry::Registry;
use super::{Printer, sleep_or_shutdown};
use crate::config::BoardSettings;
use crate::constants::{DISPLAY_COLS, SCROLL_LEAD_IN_FRAMES, SERVICE_ROW};
use crate::error::Result;

/// Pads or truncates `value` to exactly one display row.
pub fn fit_to_width(value: &str) -> String {
    format!("{:<width$.width$}", value, width = DISPLAY_COLS)
}

/// Scroll windows for `value`: one per offset from 0 to `len - 16`.
/// Values that fit on the panel produce none.
pub fn scroll_frames(value: &str) -> Vec<String> {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= DISPLAY_COLS {
        return Vec::new();
    }
    chars
        .windows(DISPLAY_COLS)
        .map(|window| window.iter().collect())
        .collect()
}

/// Self-pacing loop over the registry.
pub struct RotationScheduler {
    registry: Registry,
    printer: Printer,
    rotation_interval: Duration,
    scroll_interval: Duration,
}

impl RotationScheduler {
    pub fn new(registry: Registry, printer: Printer, settings: &BoardSettings) -> Self {
        Self {
            registry,
            printer,
            rotation_interval: settings.rotation_interval(),
            scroll_interval: settings.scroll_interval(),
        }
    }

    /// Runs cycles until shutdown is signalled or a write fails.
    ///
    /// # Errors
    ///
    /// Returns the first display failure.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        tracing::debug!(
            interval_ms = self.rotation_interval.as_millis(),
            "Rotation scheduler started"
        );
        loop {
            if sleep_or_shutdown(self.rotation_interval, &mut shutdown).await {
                break;
            }
            if self.run_cycle(&mut shutdown).await? {
                break;
            }
        }
        tracing::debug!("Rotation scheduler stopped");
        Ok(())
    }

    /// Shows the next service, scrolling it if needed. Returns true when
    /// shutdown interrupted the cycle.
    ///
    /// # Errors
    ///
    /// Returns the first display failure.
    pub async fn run_cycle(&self, shutdown: &mut watch::Receiver<bool>) -> Result<bool> {
        let Some(status) = self.registry.advance() else {
            self.printer
                .write(0, SERVICE_ROW, &" ".repeat(DISPLAY_COLS))
                .await?;
            return Ok(false);
        };

        self.printer
            .write(0, SERVICE_ROW, &fit_to_width(&status.value))
            .await?;

        let frames = scroll_frames(&status.value);
        if frames.is_empty() {
            return Ok(false);
        }

        tracing::trace!(service = %status.name, frames = frames.len(), "Scrolling value");
        if sleep_or_shutdown(self.scroll_interval * SCROLL_LEAD_IN_FRAMES, shutdown).await {
            return Ok(true);
        }
        for frame in frames {
            self.printer.write(0, SERVICE_ROW, &frame).await?;
            if sleep_or_shutdown(self.scroll_interval, shutdown).await {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MemoryDisplay;
    use crate::error::Error;

    fn scheduler(registry: &Registry) -> (RotationScheduler, crate::device::DisplayLog) {
        let (display, log) = MemoryDisplay::new();
        let printer = Printer::new(display);
        (
            RotationScheduler::new(registry.clone(), printer, &BoardSettings::default()),
            log,
        )
    }

    #[test]
    fn test_fit_to_width() {
        assert_eq!(fit_to_width("OK"), "OK              ");
        assert_eq!(fit_to_width(&"x".repeat(20)), "x".repeat(16));
        assert_eq!(fit_to_width("\u{e9}t\u{e9}").chars().count(), 16);
    }

    #[test]
    fn test_scroll_frames() {
        assert!(scroll_frames("short").is_empty());
        assert!(scroll_frames(&"x".repeat(16)).is_empty());

        let value: String = ('a'..='z').chain('0'..='9').chain('A'..='D').collect();
        assert_eq!(value.len(), 40);
        let frames = scroll_frames(&value);
        assert_eq!(frames.len(), 25);
        assert_eq!(frames[0], &value[..16]);
        assert_eq!(frames[24], &value[24..]);
        assert!(frames.iter().all(|f| f.chars().count() == 16));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_registry_blanks_row() {
        let registry = Registry::new();
        let (scheduler, log) = scheduler(&registry);
        let (_tx, mut rx) = watch::channel(false);

        assert!(!scheduler.run_cycle(&mut rx).await.unwrap());
        assert_eq!(log.row_writes(0), vec![" ".repeat(16)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_value_single_write() {
        let registry = Registry::new();
        registry.upsert("a", "OK").unwrap();
        let (scheduler, log) = scheduler(&registry);
        let (_tx, mut rx) = watch::channel(false);

        scheduler.run_cycle(&mut rx).await.unwrap();
        assert_eq!(log.row_writes(0), vec!["OK              ".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_value_scrolls() {
        let value: String = ('a'..='z').chain('0'..='9').chain('A'..='D').collect();
        let registry = Registry::new();
        registry.upsert("long", &value).unwrap();
        let (scheduler, log) = scheduler(&registry);
        let (_tx, mut rx) = watch::channel(false);

        let start = tokio::time::Instant::now();
        scheduler.run_cycle(&mut rx).await.unwrap();

        let writes = log.row_writes(0);
        assert_eq!(writes.len(), 26);
        assert_eq!(writes[0], &value[..16]);
        assert_eq!(writes[1], &value[..16]);
        assert_eq!(writes[25], &value[24..]);
        // 3 lead-in intervals plus one per frame.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500 * (3 + 25)));
        assert!(elapsed < Duration::from_millis(500 * (3 + 26)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_rotates_in_order() {
        let registry = Registry::new();
        for (name, value) in [("a", "one"), ("b", "two"), ("c", "three")] {
            registry.upsert(name, value).unwrap();
        }
        let (scheduler, log) = scheduler(&registry);
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(scheduler.run(rx));

        // First cycle after 3 s, then one every 3 s.
        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert!(log.row_writes(0).is_empty());
        tokio::time::sleep(Duration::from_millis(9000)).await;

        let shown: Vec<String> = log
            .row_writes(0)
            .iter()
            .map(|row| row.trim_end().to_string())
            .collect();
        assert_eq!(shown, vec!["two", "three", "one"]);

        tx.send(true).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_scroll() {
        let registry = Registry::new();
        registry.upsert("long", &"x".repeat(60)).unwrap();
        let (scheduler, log) = scheduler(&registry);
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(scheduler.run(rx));

        tokio::time::sleep(Duration::from_millis(4000)).await;
        tx.send(true).unwrap();
        task.await.unwrap().unwrap();
        assert!(log.row_writes(0).len() < 45);
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_failure_ends_loop() {
        let registry = Registry::new();
        registry.upsert("a", "OK").unwrap();
        let (display, _log) = MemoryDisplay::new();
        let printer = Printer::new(display.fail_after(0));
        let scheduler = RotationScheduler::new(registry, printer, &BoardSettings::default());
        let (_tx, rx) = watch::channel(false);

        let err = scheduler.run(rx).await.unwrap_err();
        assert!(matches!(err, Error::DeviceFailure(_)));
    }
}
