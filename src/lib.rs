// =============================================================================
// Lint Configuration
// =============================================================================

#![deny(unsafe_code)]
// Correctness: Must handle all fallible operations
#![deny(unused_must_use)]
// Quality: Pedantic but pragmatic
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(rust_2018_idioms)]
#![warn(unreachable_pub)]
#![allow(missing_debug_implementations)] // Types hold boxed trait objects (displays, sensors)

// Allowed with documented reasons
#![allow(clippy::missing_errors_doc)] // Error returns self-documenting via type
#![allow(clippy::module_name_repetitions)] // e.g., board::registry::Registry reads better
#![allow(clippy::doc_markdown)] // Too many false positives in code docs
#![allow(clippy::must_use_candidate)] // Not all returned values need annotation
#![allow(clippy::redundant_pub_crate)] // Explicit pub(crate) documents intent

//! Status board: services publish short values that rotate on a 16x2
//! character display, with system metrics on the second row.
//!
//! # Layout
//!
//! - [`board`] - registry, FIFO print queue, rotation and stats schedulers
//! - [`device`] - display and sensor capabilities plus implementations
//! - [`http`] - REST API over the registry
//! - [`config`], [`logging`], [`telemetry`] - startup plumbing
//!
//! # Example
//!
//! ```no_run
//! use statusboard::board::StatusBoard;
//! use statusboard::config::BoardSettings;
//! use statusboard::device::{ConsoleDisplay, FixedReading};
//!
//! # async fn example() -> statusboard::Result<()> {
//! let board = StatusBoard::new(Box::new(ConsoleDisplay::new()), BoardSettings::default());
//! board.registry().upsert("backup", "OK")?;
//!
//! let tasks = board
//!     .start(Box::new(FixedReading::new(42.0)), Box::new(FixedReading::new(0.1)))
//!     .await?;
//! tasks.shutdown().await;
//! board.close().await
//! # }
//! ```

pub mod board;
pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod http;
pub mod logging;
pub mod telemetry;

pub use board::StatusBoard;
pub use error::{Error, Result};
