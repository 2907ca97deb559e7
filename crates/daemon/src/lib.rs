pub mod config;
pub mod server;
pub mod websocket_broker;
