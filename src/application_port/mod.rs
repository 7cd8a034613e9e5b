mod session_service;
mod warehouse_service;

pub use session_service::*;
pub use warehouse_service::*;
