//! Process-wide room registry.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::room::Room;

/// Shared handle to one room. Lock it for every read or mutation.
pub type RoomHandle = Arc<Mutex<Room>>;

/// Maps room ids to rooms.
///
/// Uses `DashMap` for shard-level concurrency and a `parking_lot::Mutex` per
/// room, so joins and leaves in different rooms never contend. Lock order is
/// room → shard: never lock a room while holding a map guard.
pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
    capacity: usize,
    code_len: usize,
}

impl RoomRegistry {
    /// `capacity` applies to every room created here (`0` = unlimited);
    /// `code_len` is the length of server-chosen room ids.
    pub fn new(capacity: usize, code_len: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            capacity,
            code_len,
        }
    }

    /// Return the room named `room_id`, creating an empty one if absent.
    pub fn get_or_create(&self, room_id: &str) -> RoomHandle {
        self.rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                tracing::info!(%room_id, "room created");
                Arc::new(Mutex::new(Room::new(room_id.to_string(), self.capacity)))
            })
            .value()
            .clone()
    }

    /// Create an empty room under a fresh random code.
    pub fn create_unique(&self) -> RoomHandle {
        loop {
            let code = relay_common::room_code(self.code_len);
            match self.rooms.entry(code) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let room_id = slot.key().clone();
                    let handle = Arc::new(Mutex::new(Room::new(room_id.clone(), self.capacity)));
                    slot.insert(handle.clone());
                    tracing::info!(%room_id, "room created");
                    return handle;
                }
            }
        }
    }

    pub fn get(&self, room_id: &str) -> Option<RoomHandle> {
        self.rooms.get(room_id).map(|entry| entry.value().clone())
    }

    /// Delete `room_id` if it currently has no members. Returns whether it
    /// was removed.
    pub fn remove_if_empty(&self, room_id: &str) -> bool {
        let Some(handle) = self.get(room_id) else {
            return false;
        };
        let mut room = handle.lock();
        self.retire_if_empty(&mut room, &handle)
    }

    /// Retire an empty room whose lock the caller already holds.
    ///
    /// The map entry is only removed if it still points at `handle`, so a
    /// newer room that reused the id is left alone.
    pub(crate) fn retire_if_empty(&self, room: &mut Room, handle: &RoomHandle) -> bool {
        if !room.is_empty() || room.is_retired() {
            return false;
        }
        room.retire();
        let removed = self
            .rooms
            .remove_if(room.id(), |_, current| Arc::ptr_eq(current, handle))
            .is_some();
        if removed {
            tracing::info!(room_id = %room.id(), "deleted empty room");
        }
        removed
    }

    /// Number of rooms currently registered.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Total members across all rooms.
    pub fn member_count(&self) -> usize {
        // Snapshot handles first so no room lock is taken under a map guard.
        let handles: Vec<RoomHandle> = self.rooms.iter().map(|e| e.value().clone()).collect();
        handles.iter().map(|h| h.lock().len()).sum()
    }
}
