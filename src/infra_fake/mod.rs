mod navigator_fake;
mod transport_fake;

pub use navigator_fake::*;
pub use transport_fake::*;
