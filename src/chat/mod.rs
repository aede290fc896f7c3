//! Messaging transport interface.
//!
//! The bridge does not speak any chat protocol itself. A [`ChatConnector`]
//! opens a session and hands back a [`ChatSession`] for outbound messages
//! plus a stream of [`ChatEvent`]s for everything that comes in.

pub mod console;
pub mod credentials;

use std::fmt;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::{ConversationId, InboundMessage};

pub use console::ConsoleConnector;
pub use credentials::CredentialStore;

/// Why a messaging session closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The account was logged out; the bridge stops.
    LoggedOut,
    /// Any other loss; the bridge reconnects.
    ConnectionLost(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoggedOut => f.write_str("logged out"),
            Self::ConnectionLost(reason) => write!(f, "connection lost: {reason}"),
        }
    }
}

/// Notifications from the messaging transport.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// Session is opening and waits to be paired with this code.
    Opening { pairing_code: String },
    /// Session is open.
    Opened,
    /// Session closed.
    Closed { reason: CloseReason },
    /// Text message received.
    Message(InboundMessage),
    /// Session credentials changed and should be persisted.
    CredentialsUpdated(Bytes),
}

/// An open messaging session.
pub trait ChatSession: Send + Sync {
    /// Sends a text message to a conversation.
    fn send_message<'a>(
        &'a self,
        conversation: &'a ConversationId,
        text: &'a str,
    ) -> BoxFuture<'a, Result<()>>;

    /// Marks a received message as read.
    fn mark_read<'a>(&'a self, _message: &'a InboundMessage) -> BoxFuture<'a, Result<()>> {
        Box::pin(std::future::ready(Ok(())))
    }

    /// Shows the operator the code that pairs this session with an account.
    ///
    /// Written to stderr unless overridden, whatever the log filter.
    fn show_pairing_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut stderr = tokio::io::stderr();
            let out = format!("Pair this device with code: {code}\n");
            stderr.write_all(out.as_bytes()).await?;
            stderr.flush().await?;
            Ok(())
        })
    }
}

/// Opens messaging sessions.
pub trait ChatConnector: Send + Sync {
    /// Session produced by this connector.
    type Session: ChatSession;

    /// Opens a session with previously saved credentials, if any.
    fn connect(
        &self,
        credentials: Option<Bytes>,
    ) -> BoxFuture<'_, Result<(Self::Session, mpsc::Receiver<ChatEvent>)>>;
}
