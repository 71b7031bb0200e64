//! # Application Layer
//!
//! Use cases and the ports they depend on.

pub mod conversation_store;
pub mod interfaces;
pub mod use_cases;

pub use conversation_store::*;
pub use interfaces::*;
pub use use_cases::*;
