use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{ParticipantId, RoomId, SignalingError};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Join a room under a caller-chosen identifier
    #[serde(rename = "join-room")]
    JoinRoom {
        #[serde(rename = "roomId")]
        room_id: RoomId,
        #[serde(rename = "userId", alias = "participantId")]
        user_id: ParticipantId,
    },

    /// SDP offer for one peer
    #[serde(rename = "offer")]
    Offer { to: ParticipantId, offer: Value },

    /// SDP answer for one peer
    #[serde(rename = "answer")]
    Answer { to: ParticipantId, answer: Value },

    /// ICE candidate for one peer, or for the whole room when `to` is "broadcast"
    #[serde(rename = "ice-candidate")]
    IceCandidate { to: ParticipantId, candidate: Value },

    /// Text chat for everyone else in the room
    #[serde(rename = "chat-message")]
    ChatMessage { text: String },

    /// Leave the current room but keep the connection open
    #[serde(rename = "leave-room")]
    LeaveRoom,
}

impl ClientMessage {
    pub const KINDS: &'static [&'static str] = &[
        "join-room",
        "offer",
        "answer",
        "ice-candidate",
        "chat-message",
        "leave-room",
    ];

    /// Parse one text frame.
    ///
    /// Frames with a `type` outside [`Self::KINDS`] are reported as
    /// [`SignalingError::UnknownKind`]; everything else that fails to decode is
    /// [`SignalingError::Malformed`].
    pub fn parse(text: &str) -> Result<Self, SignalingError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| SignalingError::Malformed(e.to_string()))?;

        match value.get("type").and_then(Value::as_str) {
            Some(kind) if Self::KINDS.contains(&kind) => {}
            Some(kind) => return Err(SignalingError::UnknownKind(kind.to_owned())),
            None => return Err(SignalingError::Malformed("missing message type".to_string())),
        }

        serde_json::from_value(value).map_err(|e| SignalingError::Malformed(e.to_string()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::JoinRoom { .. } => "join-room",
            ClientMessage::Offer { .. } => "offer",
            ClientMessage::Answer { .. } => "answer",
            ClientMessage::IceCandidate { .. } => "ice-candidate",
            ClientMessage::ChatMessage { .. } => "chat-message",
            ClientMessage::LeaveRoom => "leave-room",
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Someone else entered the room
    #[serde(rename = "user-joined")]
    UserJoined {
        #[serde(rename = "userId")]
        user_id: ParticipantId,
    },

    /// Sent to a joiner only: the existing member it should make an offer to
    #[serde(rename = "offer-nomination")]
    OfferNomination {
        #[serde(rename = "targetUserId")]
        target_user_id: ParticipantId,
    },

    #[serde(rename = "offer")]
    Offer { from: ParticipantId, offer: Value },

    #[serde(rename = "answer")]
    Answer { from: ParticipantId, answer: Value },

    #[serde(rename = "ice-candidate")]
    IceCandidate {
        from: ParticipantId,
        candidate: Value,
    },

    #[serde(rename = "chat-message")]
    ChatMessage { from: ParticipantId, text: String },

    /// A member left the room or dropped its connection
    #[serde(rename = "user-left")]
    UserLeft {
        #[serde(rename = "userId")]
        user_id: ParticipantId,
    },
}

impl ServerMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::UserJoined { .. } => "user-joined",
            ServerMessage::OfferNomination { .. } => "offer-nomination",
            ServerMessage::Offer { .. } => "offer",
            ServerMessage::Answer { .. } => "answer",
            ServerMessage::IceCandidate { .. } => "ice-candidate",
            ServerMessage::ChatMessage { .. } => "chat-message",
            ServerMessage::UserLeft { .. } => "user-left",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_join_room() {
        let msg = ClientMessage::parse(r#"{"type": "join-room", "roomId": "r1", "userId": "alice"}"#)
            .unwrap();
        assert_eq!(
            msg,
            ClientMessage::JoinRoom {
                room_id: RoomId::from("r1"),
                user_id: ParticipantId::from("alice"),
            }
        );
    }

    #[test]
    fn parse_join_room_with_participant_id_alias() {
        let msg =
            ClientMessage::parse(r#"{"type": "join-room", "roomId": "r1", "participantId": "bob"}"#)
                .unwrap();
        if let ClientMessage::JoinRoom { user_id, .. } = msg {
            assert_eq!(user_id.as_str(), "bob");
        } else {
            panic!("Expected JoinRoom");
        }
    }

    #[test]
    fn parse_offer_keeps_payload_opaque() {
        let msg = ClientMessage::parse(
            r#"{"type": "offer", "to": "bob", "offer": {"sdp": "v=0", "type": "offer"}}"#,
        )
        .unwrap();
        if let ClientMessage::Offer { to, offer } = msg {
            assert_eq!(to.as_str(), "bob");
            assert_eq!(offer, json!({"sdp": "v=0", "type": "offer"}));
        } else {
            panic!("Expected Offer");
        }
    }

    #[test]
    fn parse_ice_candidate_broadcast() {
        let msg = ClientMessage::parse(
            r#"{"type": "ice-candidate", "to": "broadcast", "candidate": {"candidate": "c"}}"#,
        )
        .unwrap();
        if let ClientMessage::IceCandidate { to, .. } = msg {
            assert!(to.is_broadcast());
        } else {
            panic!("Expected IceCandidate");
        }
    }

    #[test]
    fn parse_leave_room() {
        let msg = ClientMessage::parse(r#"{"type": "leave-room"}"#).unwrap();
        assert_eq!(msg, ClientMessage::LeaveRoom);
        assert_eq!(msg.kind(), "leave-room");
    }

    #[test]
    fn unknown_kind_is_distinguished() {
        let err = ClientMessage::parse(r#"{"type": "rename-room", "name": "x"}"#).unwrap_err();
        assert!(matches!(err, SignalingError::UnknownKind(kind) if kind == "rename-room"));
    }

    #[test]
    fn missing_required_field_is_malformed() {
        let err = ClientMessage::parse(r#"{"type": "offer", "to": "bob"}"#).unwrap_err();
        assert!(matches!(err, SignalingError::Malformed(_)));

        let err = ClientMessage::parse(r#"{"type": "join-room", "roomId": "r1"}"#).unwrap_err();
        assert!(matches!(err, SignalingError::Malformed(_)));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            ClientMessage::parse("not json"),
            Err(SignalingError::Malformed(_))
        ));
        assert!(matches!(
            ClientMessage::parse(r#"{"roomId": "r1"}"#),
            Err(SignalingError::Malformed(_))
        ));
    }

    #[test]
    fn serialize_user_joined() {
        let msg = ServerMessage::UserJoined {
            user_id: ParticipantId::from("alice"),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type": "user-joined", "userId": "alice"}));
    }

    #[test]
    fn serialize_offer_nomination() {
        let msg = ServerMessage::OfferNomination {
            target_user_id: ParticipantId::from("bob"),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type": "offer-nomination", "targetUserId": "bob"}));
    }

    #[test]
    fn serialize_relayed_offer() {
        let msg = ServerMessage::Offer {
            from: ParticipantId::from("A"),
            offer: json!({"sdp": "x"}),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"type": "offer", "from": "A", "offer": {"sdp": "x"}}));
    }

    #[test]
    fn serialize_chat_and_user_left() {
        let chat = ServerMessage::ChatMessage {
            from: ParticipantId::from("A"),
            text: "hi".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&chat).unwrap(),
            json!({"type": "chat-message", "from": "A", "text": "hi"})
        );

        let left = ServerMessage::UserLeft {
            user_id: ParticipantId::from("B"),
        };
        assert_eq!(
            serde_json::to_value(&left).unwrap(),
            json!({"type": "user-left", "userId": "B"})
        );
    }
}
