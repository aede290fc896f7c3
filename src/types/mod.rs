//! Data types for the bridge.
//!
//! This module contains the core data structures used throughout the crate:
//! - Telemetry fields, decoded lines and the last-known-value snapshot
//! - Chat conversations and inbound messages

pub mod message;
pub mod telemetry;

pub use message::{ConversationId, InboundMessage};
pub use telemetry::{DecodedLine, Field, FieldValue, TelemetrySnapshot, UNKNOWN};
