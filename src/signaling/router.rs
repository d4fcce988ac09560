//! Turns inbound signaling events into registry updates and outbound batches.

use tracing::{debug, error, info, warn};

use super::messages::{ClientMessage, ServerMessage};
use super::registry::Registry;
use super::types::{
    ConnectionId, OutboundMessage, ParticipantId, RegistryStats, RoomId, SignalingError,
};

/// One outbound message and everyone who should receive it
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub recipients: Vec<ConnectionId>,
    pub message: ServerMessage,
}

impl Dispatch {
    fn to(recipient: ConnectionId, message: ServerMessage) -> Self {
        Self {
            recipients: vec![recipient],
            message,
        }
    }
}

/// Send capability supplied by a transport.
///
/// Fire-and-forget: implementations drop frames they cannot deliver.
pub trait Outbox {
    fn send(&mut self, to: ConnectionId, message: OutboundMessage);
}

/// Serialize each batch once and hand the frame to `outbox` per recipient
pub fn dispatch<O: Outbox + ?Sized>(outbox: &mut O, batches: Vec<Dispatch>) {
    for batch in batches {
        if batch.recipients.is_empty() {
            continue;
        }
        let frame = match serde_json::to_string(&batch.message) {
            Ok(json) => OutboundMessage::from(json),
            Err(e) => {
                error!("Failed to serialize {:?}: {}", batch.message, e);
                continue;
            }
        };
        for to in batch.recipients {
            outbox.send(to, frame.clone());
        }
    }
}

/// Signaling state machine over every connection.
///
/// A connection is unjoined until it sends `join-room`, joined until it leaves
/// or disconnects. Only direct offer/answer/candidate messages route outside
/// the sender's room.
#[derive(Debug, Default)]
pub struct Router {
    registry: Registry<ConnectionId>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &Registry<ConnectionId> {
        &self.registry
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    /// Parse and route one text frame. Bad frames produce nothing.
    pub fn handle_text(&mut self, from: ConnectionId, text: &str) -> Vec<Dispatch> {
        match ClientMessage::parse(text) {
            Ok(msg) => self.handle_message(from, msg),
            Err(SignalingError::UnknownKind(kind)) => {
                warn!("Dropping unknown message kind {:?} from {}", kind, from);
                Vec::new()
            }
            Err(e) => {
                warn!("Dropping message from {}: {}", from, e);
                Vec::new()
            }
        }
    }

    pub fn handle_message(&mut self, from: ConnectionId, msg: ClientMessage) -> Vec<Dispatch> {
        if let ClientMessage::JoinRoom { room_id, user_id } = msg {
            return self.join(from, room_id, user_id);
        }

        let Some(sender) = self.registry.participant_of(&from).cloned() else {
            debug!(
                "Dropping {}: {}",
                msg.kind(),
                SignalingError::NotJoined(from)
            );
            return Vec::new();
        };

        match msg {
            // handled above
            ClientMessage::JoinRoom { .. } => Vec::new(),
            ClientMessage::Offer { to, offer } => {
                self.direct(&sender, &to, ServerMessage::Offer { from: sender.clone(), offer })
            }
            ClientMessage::Answer { to, answer } => {
                self.direct(&sender, &to, ServerMessage::Answer { from: sender.clone(), answer })
            }
            ClientMessage::IceCandidate { to, candidate } => {
                let message = ServerMessage::IceCandidate {
                    from: sender.clone(),
                    candidate,
                };
                if to.is_broadcast() {
                    self.to_room(from, &sender, message)
                } else {
                    self.direct(&sender, &to, message)
                }
            }
            ClientMessage::ChatMessage { text } => self.to_room(
                from,
                &sender,
                ServerMessage::ChatMessage {
                    from: sender.clone(),
                    text,
                },
            ),
            ClientMessage::LeaveRoom => self.depart(from),
        }
    }

    /// Transport reported the connection closed
    pub fn handle_disconnect(&mut self, connection: ConnectionId) -> Vec<Dispatch> {
        self.depart(connection)
    }

    fn join(&mut self, from: ConnectionId, room: RoomId, participant: ParticipantId) -> Vec<Dispatch> {
        // "broadcast" is an ice-candidate target, never a participant.
        if participant.is_broadcast() {
            warn!(
                "Dropping join from {}: {}",
                from,
                SignalingError::Malformed(format!("reserved identifier {:?}", participant.as_str()))
            );
            return Vec::new();
        }

        let mut out = Vec::new();

        // One seat per connection: leave the old one visibly first.
        let already_seated = self
            .registry
            .participant_of(&from)
            .zip(self.registry.room_of(&from))
            .is_some_and(|(p, r)| p != &participant || r != &room);
        if already_seated {
            out.extend(self.depart(from));
        }

        let outcome = self.registry.join(room.clone(), participant.clone(), from);

        if let Some(displaced) = outcome.displaced {
            warn!(
                "Participant {} rejoined on {}, replacing {} in room {}",
                participant, from, displaced.connection, displaced.room
            );
            if displaced.room != room {
                out.extend(self.notify_left(&displaced.room, &participant));
            }
        }

        info!(
            "Participant {} joined room {} ({} members)",
            participant, room, outcome.member_count
        );

        let others = self.registry.members_except(&room, &participant);
        let recipients: Vec<ConnectionId> = others
            .iter()
            .filter_map(|m| self.registry.connection_for(m).copied())
            .collect();
        if !recipients.is_empty() {
            out.push(Dispatch {
                recipients,
                message: ServerMessage::UserJoined {
                    user_id: participant.clone(),
                },
            });
        }

        // The joiner makes the offer, to the earliest-joined member only.
        if let Some(target) = others.into_iter().next() {
            debug!("Nominating {} as offer target for {}", target, participant);
            out.push(Dispatch::to(
                from,
                ServerMessage::OfferNomination {
                    target_user_id: target,
                },
            ));
        }

        out
    }

    fn depart(&mut self, connection: ConnectionId) -> Vec<Dispatch> {
        let (Some(participant), Some(room)) = (
            self.registry.participant_of(&connection).cloned(),
            self.registry.room_of(&connection).cloned(),
        ) else {
            return Vec::new();
        };

        let remaining = self.registry.leave(&room, &participant);
        if remaining == 0 {
            info!("Participant {} left room {}, room removed (empty)", participant, room);
            return Vec::new();
        }

        info!(
            "Participant {} left room {} ({} remaining)",
            participant, room, remaining
        );
        self.notify_left(&room, &participant)
    }

    fn notify_left(&self, room: &RoomId, participant: &ParticipantId) -> Vec<Dispatch> {
        let recipients = self.registry.peer_connections(room, participant);
        if recipients.is_empty() {
            return Vec::new();
        }
        vec![Dispatch {
            recipients,
            message: ServerMessage::UserLeft {
                user_id: participant.clone(),
            },
        }]
    }

    fn direct(&self, sender: &ParticipantId, to: &ParticipantId, message: ServerMessage) -> Vec<Dispatch> {
        match self.registry.connection_for(to) {
            Some(&connection) => {
                debug!("Relaying {} from {} to {}", message.kind(), sender, to);
                vec![Dispatch::to(connection, message)]
            }
            None => {
                debug!("Dropping message from {}: {} is not connected", sender, to);
                Vec::new()
            }
        }
    }

    fn to_room(&self, from: ConnectionId, sender: &ParticipantId, message: ServerMessage) -> Vec<Dispatch> {
        let Some(room) = self.registry.room_of(&from) else {
            return Vec::new();
        };
        let recipients = self.registry.peer_connections(room, sender);
        debug!(
            "Fanning out {} from {} to {} peers in room {}",
            message.kind(),
            sender,
            recipients.len(),
            room
        );
        vec![Dispatch {
            recipients,
            message,
        }]
    }
}
