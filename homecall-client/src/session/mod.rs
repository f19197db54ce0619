mod media_source;
mod negotiator;
mod peer_session;
mod peer_state;
mod session_event;
mod session_handle;
mod webrtc_negotiator;

pub use media_source::*;
pub use negotiator::*;
pub use peer_session::*;
pub use peer_state::*;
pub use session_event::*;
pub use session_handle::*;
pub use webrtc_negotiator::*;
