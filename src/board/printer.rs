//! FIFO print queue in front of the display.
//!
//! Every producer writes through a [`Printer`]. Writes are granted the device
//! one at a time, in the order they were submitted: `tokio::sync::Mutex`
//! queues waiters fairly, so the first task to ask is the first served.
//!
//! The first device failure halts the queue. The failing write returns the
//! device error, and every later call fails with [`DisplayError::Halted`]
//! without reaching the device.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::device::{Display, DisplayError};
use crate::error::{Error, Result};
use crate::telemetry;

struct Device {
    display: Box<dyn Display>,
    halted: Option<DisplayError>,
    closed: bool,
}

impl Device {
    fn check(&self) -> std::result::Result<(), DisplayError> {
        if self.closed {
            return Err(DisplayError::Closed);
        }
        match &self.halted {
            Some(cause) => Err(DisplayError::Halted(cause.to_string())),
            None => Ok(()),
        }
    }

    fn latch(&mut self, err: &DisplayError) {
        if self.halted.is_none() {
            tracing::error!(error = %err, "Display failed, halting print queue");
            self.halted = Some(err.clone());
        }
    }
}

/// Serialized access to the shared display.
#[derive(Clone)]
pub struct Printer {
    device: Arc<Mutex<Device>>,
    pending: Arc<AtomicUsize>,
}

/// Counts a call as pending until it completes or is dropped.
struct PendingGuard<'a>(&'a AtomicUsize);

impl<'a> PendingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        let depth = counter.fetch_add(1, Ordering::SeqCst) + 1;
        telemetry::set_print_queue_depth(depth);
        Self(counter)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let depth = self.0.fetch_sub(1, Ordering::SeqCst) - 1;
        telemetry::set_print_queue_depth(depth);
    }
}

impl Printer {
    pub fn new(display: impl Display + 'static) -> Self {
        Self::from_boxed(Box::new(display))
    }

    pub fn from_boxed(display: Box<dyn Display>) -> Self {
        Self {
            device: Arc::new(Mutex::new(Device {
                display,
                halted: None,
                closed: false,
            })),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Writes `text` at `(column, row)` once every earlier submission has
    /// completed.
    ///
    /// # Errors
    ///
    /// Returns `DeviceFailure` if the device fails, or if the queue was
    /// already halted or closed.
    pub async fn write(&self, column: u8, row: u8, text: &str) -> Result<()> {
        let _pending = PendingGuard::enter(&self.pending);
        let mut device = self.device.lock().await;
        device.check()?;

        let outcome = device.display.write(column, row, text).await;
        telemetry::record_display_write(outcome.is_ok());
        if let Err(err) = &outcome {
            device.latch(err);
        }
        outcome.map_err(Error::from)
    }

    /// Clears the screen through the same queue as writes.
    ///
    /// # Errors
    ///
    /// Same as [`Printer::write`].
    pub async fn clear(&self) -> Result<()> {
        let _pending = PendingGuard::enter(&self.pending);
        let mut device = self.device.lock().await;
        device.check()?;

        let outcome = device.display.clear().await;
        if let Err(err) = &outcome {
            device.latch(err);
        }
        outcome.map_err(Error::from)
    }

    /// Releases the device after every queued write. Later calls fail with
    /// `Closed`. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `DeviceFailure` if the device fails to close.
    pub async fn close(&self) -> Result<()> {
        let mut device = self.device.lock().await;
        if device.closed {
            return Ok(());
        }
        device.closed = true;
        device.display.close().await?;
        tracing::debug!("Display released");
        Ok(())
    }

    /// Calls queued or in flight.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}
