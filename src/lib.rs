//! Real-time shared text rooms.
//!
//! The coordinator keeps a memory-resident directory of rooms and routes
//! content between the participants of each room over WebSocket. Content is
//! last-write-wins; the server never stores it.

pub mod client;
pub mod config;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod websocket;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use config::Config;
use services::RoomSyncService;

pub use routes::create_router;

/// State shared by every HTTP and WebSocket handler
pub struct AppState {
    pub service: Arc<RoomSyncService>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            service: Arc::new(RoomSyncService::with_queue_capacity(
                config.outbound_queue_capacity,
            )),
            config,
        }
    }
}
