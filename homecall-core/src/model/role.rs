use serde::{Deserialize, Serialize};
use std::fmt;

/// The two sides of a call. The role is asserted by the client itself; the relay
/// does not know or check it.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    /// Landlord side: initiates negotiation and drives capture.
    Operator,
    /// Resident side: supplies the live camera feed.
    Guest,
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operator => f.write_str("operator"),
            Self::Guest => f.write_str("guest"),
        }
    }
}
