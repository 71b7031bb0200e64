//! # Connector Layer
//!
//! External integrations implementing application interfaces:
//! - Inference (Azure AI chat completions, offline mock)
//! - Authentication (static API key, managed identity)
//! - Session storage (in-memory with idle expiry)
//! - HTTP front-end (axum)

pub mod adapter;
pub mod api;
pub mod storage;

pub use adapter::*;
pub use storage::*;
