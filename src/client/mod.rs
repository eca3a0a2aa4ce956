//! Participant side of the room protocol.
//!
//! [`Participant`] is the transport-free protocol adapter; [`RoomClient`]
//! drives one over a WebSocket connection.

pub mod connection;
pub mod content;
pub mod error;
pub mod membership;
pub mod participant;

pub use connection::{ClientSnapshot, RoomClient};
pub use content::{ContentChange, ContentHolder, TextBuffer};
pub use error::ClientError;
pub use membership::MembershipView;
pub use participant::{Notice, Participant, Reaction, SessionState};
