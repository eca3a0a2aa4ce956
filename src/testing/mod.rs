//! In-memory harness wiring participants to the sync service.
//!
//! Messages go through the same dispatch path as WebSocket frames, without a
//! network in between.

pub mod harness;

mod tests;
