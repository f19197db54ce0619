pub mod model;
pub mod utils;

#[cfg(not(target_arch = "wasm32"))]
mod rtc;

pub use model::*;
