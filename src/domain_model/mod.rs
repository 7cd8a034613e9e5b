mod guard;
mod http;
mod role;
mod session;
mod warehouse;

pub use guard::*;
pub use http::*;
pub use role::*;
pub use session::*;
pub use warehouse::*;
