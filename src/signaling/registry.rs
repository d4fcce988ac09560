//! Room membership bookkeeping. No I/O, no locking; the owner serializes access.

use std::collections::HashMap;
use std::hash::Hash;

use super::types::{ParticipantId, RegistryStats, RoomId};

/// Where a participant currently sits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat<C> {
    pub connection: C,
    pub room: RoomId,
}

/// Result of [`Registry::join`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome<C> {
    /// Member count of the joined room after the operation
    pub member_count: usize,
    /// Previous holder of the same identifier, when the join took it over
    pub displaced: Option<Seat<C>>,
}

#[derive(Debug, Default)]
struct Room {
    /// Join order, no duplicates
    members: Vec<ParticipantId>,
}

impl Room {
    fn insert(&mut self, participant: &ParticipantId) {
        if !self.members.contains(participant) {
            self.members.push(participant.clone());
        }
    }

    fn remove(&mut self, participant: &ParticipantId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != participant);
        self.members.len() != before
    }
}

/// Maps rooms to members and participants to their connection.
///
/// Invariants held between calls:
/// - no room has zero members
/// - every member of a room has a seat pointing back at that room
/// - every seat's connection maps back to its participant
#[derive(Debug)]
pub struct Registry<C> {
    rooms: HashMap<RoomId, Room>,
    seats: HashMap<ParticipantId, Seat<C>>,
    connections: HashMap<C, ParticipantId>,
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self {
            rooms: HashMap::new(),
            seats: HashMap::new(),
            connections: HashMap::new(),
        }
    }
}

impl<C> Registry<C>
where
    C: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Seat `participant` in `room` on `connection`, creating the room if needed.
    ///
    /// Last writer wins on the identifier: an existing seat for the same
    /// participant is taken over and reported in [`JoinOutcome::displaced`].
    /// If `connection` already held a different seat, that seat is vacated.
    pub fn join(&mut self, room: RoomId, participant: ParticipantId, connection: C) -> JoinOutcome<C> {
        if let Some(previous) = self.connections.get(&connection).cloned() {
            if previous != participant {
                self.vacate(&previous);
            }
        }

        let displaced = self.seats.remove(&participant).map(|old| {
            self.connections.remove(&old.connection);
            if old.room != room {
                self.remove_member(&old.room, &participant);
            }
            old
        });

        // Re-joining on the same connection is not a takeover.
        let displaced = displaced.filter(|old| old.connection != connection);

        let entry = self.rooms.entry(room.clone()).or_default();
        entry.insert(&participant);
        let member_count = entry.members.len();

        self.connections.insert(connection.clone(), participant.clone());
        self.seats.insert(participant, Seat { connection, room });

        JoinOutcome {
            member_count,
            displaced,
        }
    }

    /// Remove `participant` from `room`. Returns the members left (0 when the
    /// room was deleted or never existed).
    pub fn leave(&mut self, room: &RoomId, participant: &ParticipantId) -> usize {
        let seated_here = self
            .seats
            .get(participant)
            .is_some_and(|seat| &seat.room == room);
        if !seated_here {
            return 0;
        }

        if let Some(seat) = self.seats.remove(participant) {
            self.connections.remove(&seat.connection);
        }
        self.remove_member(room, participant)
    }

    /// Members of `room` in join order; empty for an unknown room
    pub fn members(&self, room: &RoomId) -> Vec<ParticipantId> {
        self.rooms
            .get(room)
            .map(|r| r.members.clone())
            .unwrap_or_default()
    }

    /// Members of `room` other than `participant`, in join order
    pub fn members_except(&self, room: &RoomId, participant: &ParticipantId) -> Vec<ParticipantId> {
        self.rooms
            .get(room)
            .map(|r| {
                r.members
                    .iter()
                    .filter(|m| *m != participant)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Connections of every member of `room` except `participant`
    pub fn peer_connections(&self, room: &RoomId, participant: &ParticipantId) -> Vec<C> {
        self.members_except(room, participant)
            .iter()
            .filter_map(|m| self.connection_for(m).cloned())
            .collect()
    }

    pub fn member_count(&self, room: &RoomId) -> usize {
        self.rooms.get(room).map_or(0, |r| r.members.len())
    }

    pub fn connection_for(&self, participant: &ParticipantId) -> Option<&C> {
        self.seats.get(participant).map(|seat| &seat.connection)
    }

    pub fn participant_of(&self, connection: &C) -> Option<&ParticipantId> {
        self.connections.get(connection)
    }

    pub fn room_of(&self, connection: &C) -> Option<&RoomId> {
        self.connections
            .get(connection)
            .and_then(|p| self.seats.get(p))
            .map(|seat| &seat.room)
    }

    pub fn contains_room(&self, room: &RoomId) -> bool {
        self.rooms.contains_key(room)
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            rooms: self.rooms.len(),
            participants: self.seats.len(),
            connections: self.connections.len(),
        }
    }

    fn vacate(&mut self, participant: &ParticipantId) {
        if let Some(seat) = self.seats.remove(participant) {
            self.connections.remove(&seat.connection);
            self.remove_member(&seat.room, participant);
        }
    }

    fn remove_member(&mut self, room: &RoomId, participant: &ParticipantId) -> usize {
        let Some(entry) = self.rooms.get_mut(room) else {
            return 0;
        };
        entry.remove(participant);
        let remaining = entry.members.len();
        if remaining == 0 {
            self.rooms.remove(room);
        }
        remaining
    }
}
