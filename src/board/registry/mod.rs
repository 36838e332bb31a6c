//! Service registry with per-entry expiry and a rotation cursor.
//!
//! Services are kept in first-insertion order. The rotation scheduler walks
//! that order through [`Registry::advance`]; HTTP handlers create, update and
//! delete entries. Each entry may own one expiry timer, a spawned task that
//! removes the entry through the same path as an explicit delete.
//!
//! All state sits behind one `parking_lot::Mutex`. Critical sections are
//! short and never await, so the registry is safe to call from handlers,
//! schedulers and timer tasks alike.

mod store;
mod types;


pub use store::Registry;
pub use types::{RegistrySnapshot, ServiceStatus, validate_service_name, validate_value};
