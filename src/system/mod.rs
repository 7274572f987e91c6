//! System-level modules
//!
//! - Logging initialization (tracing subscriber, file rotation)

pub mod logging;

pub use logging::init_logging;
