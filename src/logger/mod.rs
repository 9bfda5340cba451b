//! Tracing setup with a filter that can be swapped once settings are loaded.
//! `bin/logger_demo.rs` shows the bootstrap and reload sequence.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
