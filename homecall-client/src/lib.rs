mod capture;
mod config;
mod error;
mod session;
mod signaling;

pub use capture::*;
pub use config::*;
pub use error::*;
pub use session::*;
pub use signaling::*;
