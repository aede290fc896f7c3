//! Transport layer for the device link.
//!
//! This module provides the abstraction over the serial connection so that
//! the session manager can be driven by other transports in tests.

pub mod serial;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::error::Result;
use crate::event::EventDispatcher;

pub use serial::{SerialConfig, SerialConnector, SerialTransport};

/// Trait for transport implementations.
///
/// A connected transport publishes every decoded telemetry line, and a
/// final `Disconnected` event, through the dispatcher it was created with.
pub trait Transport: Send + Sync {
    /// Connects to the device.
    fn connect(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Disconnects from the device.
    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Sends data to the device.
    fn send(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>>;

    /// Returns true if connected.
    fn is_connected(&self) -> bool;
}

/// Creates a fresh transport for each device session.
pub trait Connector: Send + Sync {
    /// Transport produced by this connector.
    type Transport: Transport;

    /// Creates an unconnected transport.
    fn create(&self, config: SerialConfig, events: EventDispatcher) -> Self::Transport;
}
