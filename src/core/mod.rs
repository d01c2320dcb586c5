//! Core types for the hub
//!
//! This module provides the fundamental types used throughout the hub:
//! - `HubError` - Error types
//! - `events` - Canonical event-type vocabulary
//! - `make_id` - Opaque id generation

pub mod error;
pub mod events;
pub mod id;

pub use error::{HubError, HubResult};
pub use id::{hex_digest, make_id};
