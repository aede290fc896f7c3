//! Console messaging transport.
//!
//! Every line typed on stdin is one inbound message from a single
//! conversation; replies are printed to stdout. End of input logs the
//! session out.

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::chat::{ChatConnector, ChatEvent, ChatSession, CloseReason};
use crate::error::{Error, Result};
use crate::types::{ConversationId, InboundMessage};

/// Conversation name used for console input.
pub const CONSOLE_CONVERSATION: &str = "console";

/// Event channel capacity.
const EVENT_CAPACITY: usize = 64;

/// Console session writing replies to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSession;

impl ChatSession for ConsoleSession {
    fn send_message<'a>(
        &'a self,
        conversation: &'a ConversationId,
        text: &'a str,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut stdout = tokio::io::stdout();
            let out = format!("[{conversation}] {text}\n");
            stdout.write_all(out.as_bytes()).await.map_err(Error::Io)?;
            stdout.flush().await.map_err(Error::Io)?;
            Ok(())
        })
    }
}

/// Connects the bridge to the terminal.
#[derive(Debug)]
pub struct ConsoleConnector {
    conversation: ConversationId,
}

impl ConsoleConnector {
    /// Creates a console connector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            conversation: ConversationId::new(CONSOLE_CONVERSATION),
        }
    }
}

impl Default for ConsoleConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatConnector for ConsoleConnector {
    type Session = ConsoleSession;

    fn connect(
        &self,
        _credentials: Option<Bytes>,
    ) -> BoxFuture<'_, Result<(ConsoleSession, mpsc::Receiver<ChatEvent>)>> {
        Box::pin(async move {
            let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
            tx.send(ChatEvent::Opened)
                .await
                .map_err(|_| Error::ChannelSend)?;

            let conversation = self.conversation.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(tokio::io::stdin()).lines();
                let mut id = 1u64;
                let reason = loop {
                    match lines.next_line().await {
                        Ok(Some(text)) => {
                            let message =
                                InboundMessage::new(id.to_string(), conversation.clone(), text);
                            id += 1;
                            if tx.send(ChatEvent::Message(message)).await.is_err() {
                                return;
                            }
                        }
                        Ok(None) => break CloseReason::LoggedOut,
                        Err(e) => break CloseReason::ConnectionLost(e.to_string()),
                    }
                };
                let _ = tx.send(ChatEvent::Closed { reason }).await;
            });

            Ok((ConsoleSession, rx))
        })
    }
}
