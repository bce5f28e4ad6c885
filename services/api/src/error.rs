//! services/api/src/error.rs
//!
//! Errors raised by the host itself. Session-level failures never reach this
//! type; they are reported to the client over the socket instead.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Startup configuration was missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An outgoing server message could not be encoded.
    #[error("Failed to encode server message: {0}")]
    Encode(#[from] serde_json::Error),

    /// The client's socket rejected a frame.
    #[error("WebSocket Error: {0}")]
    Websocket(#[from] axum::Error),

    /// Binding or serving the listener failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Startup wiring failed for a reason with no dedicated variant.
    #[error("Startup error: {0}")]
    Startup(String),
}
