//! System metrics on the bottom row.
//!
//! Every tick samples the temperature and CPU usage and submits one write of
//! the formatted line. Submissions run as their own tasks so a slow panel
//! never delays the next tick. When too many of them are still waiting in
//! the print queue the tick is skipped instead.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};

use super::{Printer, stopped};
use crate::config::BoardSettings;
use crate::constants::{DISPLAY_COLS, STATS_ROW};
use crate::device::{TemperatureSource, UsageSource};
use crate::error::Result;
use crate::telemetry;

/// Degree sign in the HD44780 character ROM.
const DEGREE: char = '\u{df}';

/// Shown in place of a reading that could not be taken.
const UNAVAILABLE: &str = "--";

/// `48.3°C`, truncated (not rounded) to one decimal.
pub fn format_temperature(celsius: Option<f64>) -> String {
    match celsius {
        Some(t) => format!("{}{DEGREE}C", (t * 10.0).floor() / 10.0),
        None => format!("{UNAVAILABLE}{DEGREE}C"),
    }
}

/// `12.5%`. The fraction is scaled by the core count, truncated to one
/// decimal.
#[allow(clippy::cast_precision_loss)]
pub fn format_usage(fraction: Option<f64>, cores: usize) -> String {
    match fraction {
        Some(f) => format!("{}%", (f * cores as f64 * 1000.0).floor() / 10.0),
        None => format!("{UNAVAILABLE}%"),
    }
}

/// Temperature on the left, usage on the right, one row wide.
pub fn format_stats_line(temperature: &str, usage: &str) -> String {
    let width = DISPLAY_COLS.saturating_sub(usage.chars().count());
    format!("{temperature:<width$}{usage}")
        .chars()
        .take(DISPLAY_COLS)
        .collect()
}

/// Fixed-rate sampler for the stats row.
pub struct StatsScheduler {
    printer: Printer,
    temperature: Box<dyn TemperatureSource>,
    usage: Box<dyn UsageSource>,
    interval: Duration,
    max_pending: usize,
}

impl StatsScheduler {
    pub fn new(
        printer: Printer,
        temperature: Box<dyn TemperatureSource>,
        usage: Box<dyn UsageSource>,
        settings: &BoardSettings,
    ) -> Self {
        Self {
            printer,
            temperature,
            usage,
            interval: settings.stats_interval(),
            max_pending: settings.max_pending_stats_writes,
        }
    }

    /// Samples both sources and formats the row.
    pub async fn sample(&self) -> String {
        let (temperature, usage) = tokio::join!(self.temperature.read(), self.usage.read());

        let temperature = temperature
            .inspect_err(|e| tracing::warn!(error = %e, "Temperature reading failed"))
            .ok();
        let usage = usage
            .inspect_err(|e| tracing::warn!(error = %e, "CPU usage reading failed"))
            .ok();

        format_stats_line(
            &format_temperature(temperature),
            &format_usage(usage, self.usage.cores()),
        )
    }

    /// Ticks until shutdown is signalled or a submitted write fails.
    ///
    /// # Errors
    ///
    /// Returns the first display failure reported by a submitted write.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut writes: JoinSet<Result<()>> = JoinSet::new();

        tracing::debug!(
            interval_ms = self.interval.as_millis(),
            max_pending = self.max_pending,
            "Stats scheduler started"
        );

        loop {
            tokio::select! {
                () = stopped(&mut shutdown) => break,
                Some(joined) = writes.join_next(), if !writes.is_empty() => {
                    match joined {
                        Ok(Ok(())) => {},
                        Ok(Err(e)) => return Err(e),
                        Err(e) => tracing::error!(error = %e, "Stats write task panicked"),
                    }
                },
                _ = ticker.tick() => {
                    if writes.len() >= self.max_pending {
                        telemetry::record_stats_tick_skipped();
                        tracing::warn!(
                            pending = writes.len(),
                            "Print queue saturated, skipping stats tick"
                        );
                        continue;
                    }
                    let line = self.sample().await;
                    let printer = self.printer.clone();
                    writes.spawn(async move { printer.write(0, STATS_ROW, &line).await });
                },
            }
        }

        // Let submitted writes finish before the device is released.
        while writes.join_next().await.is_some() {}
        tracing::debug!("Stats scheduler stopped");
        Ok(())
    }
}
