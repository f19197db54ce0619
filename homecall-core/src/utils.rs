pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

/// Number of participants a session is designed for: one operator and one guest.
pub const SESSION_CAPACITY: usize = 2;
