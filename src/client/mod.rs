mod client;
mod navigator_log;

pub use client::*;
pub use navigator_log::*;
