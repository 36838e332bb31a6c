//! In-memory display used as a test double.
//!
//! Records every operation, keeps a framebuffer, and tracks how many calls
//! were inside the device at the same time so tests can assert the print
//! queue never overlaps writes. Latency and failure injection let tests
//! reproduce a slow or broken panel.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use super::{Display, DisplayError, Framebuffer};

/// One call received by a [`MemoryDisplay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOp {
    Clear,
    Write { column: u8, row: u8, text: String },
    Close,
}

#[derive(Default)]
struct Shared {
    ops: Vec<DisplayOp>,
    screen: Framebuffer,
    in_flight: usize,
    max_in_flight: usize,
    /// Successful writes left before writes start failing.
    writes_until_failure: Option<usize>,
    closed: bool,
}

/// Read side of a [`MemoryDisplay`], kept by the test after the display
/// itself has been handed to the print queue.
#[derive(Clone, Default)]
pub struct DisplayLog {
    shared: Arc<Mutex<Shared>>,
}

impl DisplayLog {
    /// Every operation in the order the device received it.
    pub fn ops(&self) -> Vec<DisplayOp> {
        self.shared.lock().ops.clone()
    }

    /// Texts written to `row`, in order.
    pub fn row_writes(&self, row: u8) -> Vec<String> {
        self.shared
            .lock()
            .ops
            .iter()
            .filter_map(|op| match op {
                DisplayOp::Write { row: r, text, .. } if *r == row => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of writes received.
    pub fn write_count(&self) -> usize {
        self.shared
            .lock()
            .ops
            .iter()
            .filter(|op| matches!(op, DisplayOp::Write { .. }))
            .count()
    }

    /// Current screen contents, top row first.
    pub fn screen(&self) -> [String; 2] {
        self.shared.lock().screen.lines()
    }

    /// Highest number of calls that were inside the device at once.
    pub fn max_concurrent(&self) -> usize {
        self.shared.lock().max_in_flight
    }

    /// Whether `close` was called.
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

/// Display double backed by memory.
pub struct MemoryDisplay {
    log: DisplayLog,
    latency: Duration,
}

impl MemoryDisplay {
    /// Creates a display and the log handle observing it.
    pub fn new() -> (Self, DisplayLog) {
        let log = DisplayLog::default();
        (
            Self {
                log: log.clone(),
                latency: Duration::ZERO,
            },
            log,
        )
    }

    /// Every write takes `latency` to complete.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Accept `writes` successful writes, then fail every following one.
    #[must_use]
    pub fn fail_after(self, writes: usize) -> Self {
        self.log.shared.lock().writes_until_failure = Some(writes);
        self
    }

    fn enter(&self) {
        let mut shared = self.log.shared.lock();
        shared.in_flight += 1;
        shared.max_in_flight = shared.max_in_flight.max(shared.in_flight);
    }

    async fn settle(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl Display for MemoryDisplay {
    async fn clear(&mut self) -> Result<(), DisplayError> {
        self.enter();
        self.settle().await;
        let mut shared = self.log.shared.lock();
        shared.in_flight -= 1;
        if shared.closed {
            return Err(DisplayError::Closed);
        }
        shared.ops.push(DisplayOp::Clear);
        shared.screen.clear();
        Ok(())
    }

    async fn write(&mut self, column: u8, row: u8, text: &str) -> Result<(), DisplayError> {
        self.enter();
        self.settle().await;
        let mut shared = self.log.shared.lock();
        shared.in_flight -= 1;
        if shared.closed {
            return Err(DisplayError::Closed);
        }
        match shared.writes_until_failure {
            Some(0) => return Err(DisplayError::Bus("injected failure".to_string())),
            Some(ref mut left) => *left -= 1,
            None => {},
        }
        shared.screen.write(column, row, text)?;
        shared.ops.push(DisplayOp::Write {
            column,
            row,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DisplayError> {
        let mut shared = self.log.shared.lock();
        shared.closed = true;
        shared.ops.push(DisplayOp::Close);
        Ok(())
    }
}
