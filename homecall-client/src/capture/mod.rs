mod artifact;
mod artifact_store;
mod capture_pipeline;
mod frame_decoder;
mod recorder;
mod remote_stream;
mod screenshot;
pub mod vp8;

pub use artifact::*;
pub use artifact_store::*;
pub use capture_pipeline::*;
pub use frame_decoder::*;
pub use recorder::*;
pub use remote_stream::*;
pub use screenshot::*;
