//! Shared utilities for the Tessera governance core.

pub mod logging;
pub mod time;

pub use logging::{init_logging, init_test_logging, LogFormat};
pub use time::format_duration;
