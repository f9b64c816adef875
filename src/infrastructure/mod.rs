// Infrastructure: process wiring around the tool service

pub mod logging;
pub mod server;

pub use logging::LoggingConfig;
pub use server::{handle_line, serve, start_server, ServerConfig};
