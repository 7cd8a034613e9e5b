//! Process-wide `tracing` setup: a bootstrap filter installed before settings
//! are read, swapped for the configured one afterwards.
//! `bin/logger_demo.rs` shows the output at each stage.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
