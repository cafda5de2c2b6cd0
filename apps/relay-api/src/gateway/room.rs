//! Membership state for one room.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::RelayError;

use super::color;
use super::events::MemberView;
use super::session::{MemberLink, MemberSession};

/// A member removed from a room, plus the host election it caused.
#[derive(Debug)]
pub struct Departure {
    pub member: MemberSession,
    /// Set when the departing member was host and someone else took over.
    pub new_host: Option<String>,
}

/// Ordered membership, host pointer, and capacity of one room.
///
/// Always accessed under the per-room mutex held by the registry. Invariants:
/// a non-empty room has exactly one member with `is_host`, `host_id` names
/// that member, and no two members share a palette color.
#[derive(Debug)]
pub struct Room {
    id: String,
    /// Maximum simultaneous members; `0` means unlimited.
    capacity: usize,
    members: Vec<MemberSession>,
    host_id: Option<String>,
    /// Bumped on every membership change; sent with each snapshot so
    /// clients can discard one that arrives late.
    revision: u64,
    /// Set once the room has been dropped from the registry.
    retired: bool,
}

impl Room {
    pub fn new(id: String, capacity: usize) -> Self {
        Self {
            id,
            capacity,
            members: Vec::new(),
            host_id: None,
            revision: 0,
            retired: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.members.len() >= self.capacity
    }

    pub fn host_id(&self) -> Option<&str> {
        self.host_id.as_deref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn members(&self) -> &[MemberSession] {
        &self.members
    }

    pub fn member(&self, member_id: &str) -> Option<&MemberSession> {
        self.members.iter().find(|m| m.id == member_id)
    }

    pub fn used_colors(&self) -> HashSet<&str> {
        self.members.iter().map(|m| m.color.as_str()).collect()
    }

    /// Append a new member, allocating its color and host role.
    ///
    /// The first member of an empty room becomes host. Returns the new
    /// member's view.
    pub fn admit(
        &mut self,
        member_id: String,
        name: String,
        link: MemberLink,
    ) -> Result<MemberView, RelayError> {
        if self.is_full() {
            return Err(RelayError::RoomFull {
                room_id: self.id.clone(),
                capacity: self.capacity,
            });
        }

        let color = color::allocate(&self.used_colors());
        let is_host = self.members.is_empty();
        if is_host {
            self.host_id = Some(member_id.clone());
        }
        let member = MemberSession {
            id: member_id,
            name,
            color,
            position: None,
            is_host,
            link,
        };
        let view = member.view();
        self.members.push(member);
        self.revision += 1;
        Ok(view)
    }

    /// Remove a member. Returns `None` if it is not in the room.
    ///
    /// When the host leaves a non-empty room the earliest-joined remaining
    /// member is promoted.
    pub fn remove(&mut self, member_id: &str) -> Option<Departure> {
        let idx = self.members.iter().position(|m| m.id == member_id)?;
        let member = self.members.remove(idx);
        self.revision += 1;

        let mut new_host = None;
        if member.is_host {
            self.host_id = None;
            if let Some(successor) = self.members.first_mut() {
                successor.is_host = true;
                self.host_id = Some(successor.id.clone());
                new_host = Some(successor.id.clone());
            }
        }

        Some(Departure { member, new_host })
    }

    /// Record a member's latest position.
    pub fn set_position(&mut self, member_id: &str, position: Value) -> Option<&MemberSession> {
        let member = self.members.iter_mut().find(|m| m.id == member_id)?;
        member.position = Some(position);
        Some(member)
    }

    /// Ordered membership snapshot.
    pub fn snapshot(&self) -> Vec<MemberView> {
        self.members.iter().map(MemberSession::view).collect()
    }

    /// Delivery handles for every member except `exclude`.
    pub fn recipients(&self, exclude: Option<&str>) -> Vec<MemberLink> {
        self.members
            .iter()
            .filter(|m| Some(m.id.as_str()) != exclude)
            .map(|m| m.link.clone())
            .collect()
    }

    pub(crate) fn retire(&mut self) {
        self.retired = true;
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }
}
