use crate::error::RelayError;
use homecall_core::{EndpointId, SessionToken};
use std::collections::HashMap;
use tokio::time::{Duration, Instant};

#[derive(Debug)]
pub struct Room {
    members: Vec<EndpointId>,
    /// Set when the last member leaves; cleared on the next join.
    empty_since: Option<Instant>,
}

impl Room {
    fn new() -> Self {
        Self {
            members: Vec::new(),
            empty_since: None,
        }
    }

    pub fn members(&self) -> &[EndpointId] {
        &self.members
    }

    pub fn contains(&self, endpoint: &EndpointId) -> bool {
        self.members.contains(endpoint)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// First member; the room entry was created by this join.
    Created,
    Joined,
    AlreadyMember,
}

/// Session token → set of connected endpoints.
///
/// Owned by the relay loop, so no locking. Rooms are created implicitly on the
/// first join and are never removed on leave; [`RoomRegistry::sweep`] reclaims
/// rooms that stayed empty past an idle timeout.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: HashMap<SessionToken, Room>,
    capacity: usize,
}

impl RoomRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn join(
        &mut self,
        token: &SessionToken,
        endpoint: EndpointId,
    ) -> Result<JoinOutcome, RelayError> {
        let created = !self.rooms.contains_key(token);
        let room = self.rooms.entry(token.clone()).or_insert_with(Room::new);

        if room.contains(&endpoint) {
            return Ok(JoinOutcome::AlreadyMember);
        }
        if room.members.len() >= self.capacity {
            return Err(RelayError::RoomFull {
                token: token.clone(),
                capacity: self.capacity,
            });
        }

        room.members.push(endpoint);
        room.empty_since = None;

        Ok(if created {
            JoinOutcome::Created
        } else {
            JoinOutcome::Joined
        })
    }

    /// Returns whether the endpoint was a member.
    pub fn leave(&mut self, token: &SessionToken, endpoint: &EndpointId) -> bool {
        let Some(room) = self.rooms.get_mut(token) else {
            return false;
        };
        let before = room.members.len();
        room.members.retain(|m| m != endpoint);
        let removed = room.members.len() != before;

        if removed && room.is_empty() {
            room.empty_since = Some(Instant::now());
        }
        removed
    }

    pub fn room(&self, token: &SessionToken) -> Option<&Room> {
        self.rooms.get(token)
    }

    pub fn members(&self, token: &SessionToken) -> &[EndpointId] {
        self.rooms.get(token).map(Room::members).unwrap_or(&[])
    }

    /// Every member of `token`'s room except `sender`.
    pub fn recipients(&self, token: &SessionToken, sender: &EndpointId) -> Vec<EndpointId> {
        self.members(token)
            .iter()
            .filter(|m| *m != sender)
            .copied()
            .collect()
    }

    /// Drops rooms that have had no members for at least `idle`.
    pub fn sweep(&mut self, now: Instant, idle: Duration) -> Vec<SessionToken> {
        let expired: Vec<SessionToken> = self
            .rooms
            .iter()
            .filter_map(|(token, room)| match room.empty_since {
                Some(since) if room.is_empty() && now.saturating_duration_since(since) >= idle => {
                    Some(token.clone())
                }
                _ => None,
            })
            .collect();

        for token in &expired {
            self.rooms.remove(token);
        }
        expired
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
