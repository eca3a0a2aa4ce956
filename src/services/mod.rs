pub mod room_directory;
pub mod room_sync_service;

pub use room_directory::*;
pub use room_sync_service::*;
