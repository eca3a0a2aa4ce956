pub mod handler;
pub mod msg_change_handler;
pub mod msg_join_handler;
pub mod msg_ping_handler;
pub mod msg_sync_handler;
pub mod teardown;

pub use handler::websocket_handler;
