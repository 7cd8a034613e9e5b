mod http_transport;
mod navigator;
mod token_store;

pub use http_transport::*;
pub use navigator::*;
pub use token_store::*;
