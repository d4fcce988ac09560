//! WebSocket signaling relay for P2P session setup

mod actor;
mod health;
mod messages;
mod registry;
mod router;
mod server;
mod types;

pub use actor::{OUTBOUND_QUEUE_CAPACITY, RoomManagerHandle};
pub use health::{DEFAULT_HEALTH_PORT, health_router, serve_health};
pub use messages::{ClientMessage, ServerMessage};
pub use registry::{JoinOutcome, Registry, Seat};
pub use router::{Dispatch, Outbox, Router, dispatch};
pub use server::{DEFAULT_SIGNALING_PORT, ServerSettings, SignalingServer};
pub use types::{
    BROADCAST, ConnectionId, OutboundMessage, ParticipantId, RegistryStats, RoomId,
    SignalingError,
};
