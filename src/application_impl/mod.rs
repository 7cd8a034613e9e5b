mod session_manager;
mod token_renewal;
mod warehouse_service_impl;

pub use session_manager::*;
pub use token_renewal::*;
pub use warehouse_service_impl::*;
