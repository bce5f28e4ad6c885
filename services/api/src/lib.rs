//! services/api/src/lib.rs
//!
//! The study session API host: configuration, the OpenAI dialogue adapter and
//! the WebSocket/REST surface that drives the core sessions.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
