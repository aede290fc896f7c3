//! # rover-relay
//!
//! A chat bridge for a microcontroller-driven rover.
//!
//! The rover prints one JSON telemetry object per line over USB/Serial. The
//! bridge keeps the last known value of every reading and answers operator
//! commands received through a messaging session, forwarding the few
//! commands that change the rover's behavior back over the serial link.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Tolerant line decoding: malformed lines are dropped, partial lines merge
//! - Single-owner telemetry snapshot, no global state
//! - Pluggable messaging and device transports
//!
//! ## Quick Start
//!
//! ```no_run
//! use rover_relay::{Bridge, BridgeConfig, ConsoleConnector, SerialConnector};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), rover_relay::Error> {
//!     let config = BridgeConfig::default().greet("console");
//!     let mut bridge = Bridge::new(config, ConsoleConnector::new(), SerialConnector);
//!
//!     // Type "/conectar COM3 9600", then "/all"
//!     bridge.run().await
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`protocol`] - Line framing, telemetry parsing, control tokens
//! - [`types`] - Telemetry snapshot and chat message types
//! - [`transport`] - Device transports (currently USB/Serial)
//! - [`event`] - Device event queue and subscriptions
//! - [`session`] - Device session lifecycle
//! - [`commands`] - Operator command dispatcher
//! - [`chat`] - Messaging transport interface and console implementation
//! - [`bridge`] - The [`Bridge`] event loop

pub mod bridge;
pub mod chat;
pub mod commands;
pub mod error;
pub mod event;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use bridge::{Bridge, BridgeConfig};
pub use chat::{
    ChatConnector, ChatEvent, ChatSession, CloseReason, ConsoleConnector, CredentialStore,
};
pub use commands::{Action, Command, CommandConfig, CommandDispatcher, Query};
pub use error::{Error, LineError, Result};
pub use event::{Event, EventDispatcher, EventFilter, Subscription};
pub use protocol::{ControlToken, LineDecoder, Toggle, decode_line};
pub use session::{DeviceSession, DeviceSessionManager, SessionState};
pub use transport::{
    Connector, SerialConfig, SerialConnector, SerialTransport, Transport, serial::list_ports,
};
pub use types::{
    ConversationId, DecodedLine, Field, FieldValue, InboundMessage, TelemetrySnapshot, UNKNOWN,
};
