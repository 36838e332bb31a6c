//! The status board service.
//!
//! A [`StatusBoard`] owns the service [`Registry`] and the [`Printer`] in
//! front of the display. [`StatusBoard::start`] clears the screen and spawns
//! the rotation and stats schedulers; the returned [`BoardTasks`] reports
//! when either of them stops and shuts both down on request.
//!
//! ```text
//!   HTTP handlers ──► Registry ◄── expiry timers
//!                        │
//!                        ▼ advance()
//!               RotationScheduler ──┐
//!                                   ├──► Printer ──► Display
//!                  StatsScheduler ──┘
//! ```

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

pub mod printer;
pub mod registry;
pub mod rotation;
pub mod stats;

pub use printer::Printer;
pub use registry::{Registry, RegistrySnapshot, ServiceStatus};
pub use rotation::RotationScheduler;
pub use stats::StatsScheduler;

use crate::config::BoardSettings;
use crate::device::{Display, TemperatureSource, UsageSource};
use crate::error::Result;

/// Resolves once shutdown is signalled or the sender is gone. The
/// `wait_for` borrow is dropped inside, keeping callers `Send`.
pub(crate) async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Sleeps for `duration`. Returns true if shutdown was signalled first.
pub(crate) async fn sleep_or_shutdown(
    duration: Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    tokio::select! {
        () = tokio::time::sleep(duration) => false,
        () = stopped(shutdown) => true,
    }
}

/// One board: registry, print queue and scheduler settings.
pub struct StatusBoard {
    registry: Registry,
    printer: Printer,
    settings: BoardSettings,
}

impl StatusBoard {
    pub fn new(display: Box<dyn Display>, settings: BoardSettings) -> Self {
        Self {
            registry: Registry::new(),
            printer: Printer::from_boxed(display),
            settings,
        }
    }

    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    pub const fn printer(&self) -> &Printer {
        &self.printer
    }

    /// Clears the display and spawns both schedulers.
    ///
    /// # Errors
    ///
    /// Returns `DeviceFailure` if the display cannot be cleared. Nothing is
    /// spawned in that case.
    pub async fn start(
        &self,
        temperature: Box<dyn TemperatureSource>,
        usage: Box<dyn UsageSource>,
    ) -> Result<BoardTasks> {
        self.printer.clear().await?;

        let (shutdown, rx) = watch::channel(false);
        let mut tasks = JoinSet::new();

        let rotation =
            RotationScheduler::new(self.registry.clone(), self.printer.clone(), &self.settings);
        tasks.spawn(rotation.run(rx.clone()));

        let stats = StatsScheduler::new(self.printer.clone(), temperature, usage, &self.settings);
        tasks.spawn(stats.run(rx));

        tracing::info!("Board started");
        Ok(BoardTasks { tasks, shutdown })
    }

    /// Releases the display.
    ///
    /// # Errors
    ///
    /// Returns `DeviceFailure` if the device fails to close.
    pub async fn close(&self) -> Result<()> {
        self.printer.close().await
    }
}

/// Running schedulers.
pub struct BoardTasks {
    tasks: JoinSet<Result<()>>,
    shutdown: watch::Sender<bool>,
}

impl BoardTasks {
    /// Resolves when a scheduler stops. During normal operation that only
    /// happens on a display failure, which is returned. Pending forever once
    /// every scheduler has been joined.
    ///
    /// # Errors
    ///
    /// Returns the scheduler's error.
    pub async fn next_exit(&mut self) -> Result<()> {
        match self.tasks.join_next().await {
            Some(Ok(outcome)) => outcome,
            Some(Err(join_error)) => {
                tracing::error!(error = %join_error, "Scheduler task panicked");
                Ok(())
            },
            None => std::future::pending().await,
        }
    }

    /// Signals both schedulers and waits for them to stop.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(Err(e)) => tracing::warn!(error = %e, "Scheduler stopped with error"),
                Err(e) => tracing::warn!(error = %e, "Scheduler task failed"),
                Ok(Ok(())) => {},
            }
        }
        tracing::info!("Board stopped");
    }
}
