//! Main [`Bridge`] implementation.
//!
//! The bridge owns the telemetry snapshot and the device session and runs a
//! single loop that serves, one at a time, decoded device lines and
//! messaging events. Nothing is shared across tasks: the snapshot is only
//! touched from this loop.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::chat::{ChatConnector, ChatEvent, ChatSession, CloseReason, CredentialStore};
use crate::commands::{CommandConfig, CommandDispatcher, reply};
use crate::error::Result;
use crate::event::{Event, EventDispatcher};
use crate::session::DeviceSessionManager;
use crate::transport::Connector;
use crate::types::{ConversationId, InboundMessage, TelemetrySnapshot};

/// Default delay before reconnecting a lost messaging session.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default directory for messaging credentials.
pub const DEFAULT_AUTH_DIR: &str = "auth_info";

/// Device event queue capacity.
const EVENT_CAPACITY: usize = 256;

/// Configuration for the bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Command handling settings.
    pub commands: CommandConfig,
    /// Delay before reconnecting a lost messaging session.
    pub reconnect_delay: Duration,
    /// Conversation greeted when the messaging session opens.
    pub greeting_conversation: Option<ConversationId>,
    /// Greeting text.
    pub greeting_text: String,
    /// Directory holding the messaging credentials.
    pub auth_dir: PathBuf,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            commands: CommandConfig::default(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            greeting_conversation: None,
            greeting_text: reply::GREETING.to_owned(),
            auth_dir: PathBuf::from(DEFAULT_AUTH_DIR),
        }
    }
}

impl BridgeConfig {
    /// Sets the command handling settings.
    #[must_use]
    pub fn commands(mut self, commands: CommandConfig) -> Self {
        self.commands = commands;
        self
    }

    /// Sets the reconnect delay.
    #[must_use]
    pub const fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Greets `conversation` whenever the messaging session opens.
    #[must_use]
    pub fn greet(mut self, conversation: impl Into<ConversationId>) -> Self {
        self.greeting_conversation = Some(conversation.into());
        self
    }

    /// Sets the credentials directory.
    #[must_use]
    pub fn auth_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.auth_dir = dir.into();
        self
    }
}

/// Relays device telemetry and operator commands over a messaging session.
pub struct Bridge<M, C: Connector> {
    config: BridgeConfig,
    chat: M,
    credentials: CredentialStore,
    telemetry: TelemetrySnapshot,
    commands: CommandDispatcher,
    sessions: DeviceSessionManager<C>,
    events: mpsc::Receiver<Event>,
}

impl<M: ChatConnector, C: Connector> Bridge<M, C> {
    /// Creates a bridge with no device session and an empty snapshot.
    #[must_use]
    pub fn new(config: BridgeConfig, chat: M, device: C) -> Self {
        let (dispatcher, events) = EventDispatcher::new(EVENT_CAPACITY);

        Self {
            credentials: CredentialStore::new(&config.auth_dir),
            commands: CommandDispatcher::new(config.commands.clone()),
            sessions: DeviceSessionManager::new(device, dispatcher),
            telemetry: TelemetrySnapshot::new(),
            config,
            chat,
            events,
        }
    }

    /// Returns the current telemetry snapshot.
    #[must_use]
    pub const fn telemetry(&self) -> &TelemetrySnapshot {
        &self.telemetry
    }

    /// Returns the device session manager.
    #[must_use]
    pub const fn sessions(&self) -> &DeviceSessionManager<C> {
        &self.sessions
    }

    /// Runs until the messaging account is logged out.
    ///
    /// Any other loss of the messaging session is followed by a reconnect
    /// after the configured delay.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let credentials = match self.credentials.load().await {
                Ok(credentials) => credentials,
                Err(e) => {
                    tracing::warn!("failed to load credentials: {}", e);
                    None
                }
            };

            let (chat, mut chat_events) = match self.chat.connect(credentials).await {
                Ok(connected) => connected,
                Err(e) => {
                    tracing::error!("failed to open messaging session: {}", e);
                    tokio::time::sleep(self.config.reconnect_delay).await;
                    continue;
                }
            };

            match self.serve(&chat, &mut chat_events).await {
                CloseReason::LoggedOut => {
                    tracing::info!("logged out");
                    break;
                }
                CloseReason::ConnectionLost(reason) => {
                    tracing::warn!("messaging session lost ({}), reconnecting", reason);
                    tokio::time::sleep(self.config.reconnect_delay).await;
                }
            }
        }

        self.sessions.disconnect().await
    }

    /// Serves one messaging session until it closes.
    async fn serve(
        &mut self,
        chat: &M::Session,
        chat_events: &mut mpsc::Receiver<ChatEvent>,
    ) -> CloseReason {
        loop {
            tokio::select! {
                // Device lines first, so replies see every line already received
                biased;
                Some(event) = self.events.recv() => self.handle_device_event(event),
                event = chat_events.recv() => match event {
                    Some(ChatEvent::Closed { reason }) => return reason,
                    Some(event) => self.handle_chat_event(chat, event).await,
                    None => return CloseReason::ConnectionLost("event stream ended".into()),
                },
            }
        }
    }

    fn handle_device_event(&mut self, event: Event) {
        match event {
            Event::Line(line) => {
                tracing::trace!("merging {:?}", line.fields());
                self.telemetry.merge(line);
            }
            Event::Connected { port } => tracing::info!("device connected on {}", port),
            Event::Disconnected { port } => {
                tracing::info!("device on {} disconnected", port);
                self.sessions.mark_closed(&port);
            }
        }
    }

    async fn handle_chat_event(&mut self, chat: &M::Session, event: ChatEvent) {
        match event {
            ChatEvent::Opening { pairing_code } => {
                tracing::info!("waiting to be paired");
                if let Err(e) = chat.show_pairing_code(&pairing_code).await {
                    tracing::warn!("failed to show pairing code {}: {}", pairing_code, e);
                }
            }
            ChatEvent::Opened => {
                tracing::info!("messaging session open");
                if let Some(conversation) = &self.config.greeting_conversation {
                    if let Err(e) = chat
                        .send_message(conversation, &self.config.greeting_text)
                        .await
                    {
                        tracing::warn!("failed to greet {}: {}", conversation, e);
                    }
                }
            }
            ChatEvent::Message(message) => self.handle_message(chat, message).await,
            ChatEvent::CredentialsUpdated(blob) => {
                if let Err(e) = self.credentials.save(&blob).await {
                    tracing::warn!("failed to save credentials: {}", e);
                }
            }
            ChatEvent::Closed { .. } => {}
        }
    }

    async fn handle_message(&mut self, chat: &M::Session, message: InboundMessage) {
        if message.from_self || message.text.trim().is_empty() {
            return;
        }

        if let Err(e) = chat.mark_read(&message).await {
            tracing::debug!("failed to mark {} as read: {}", message.id, e);
        }

        let reply = self
            .commands
            .dispatch(&message.text, &self.telemetry, &mut self.sessions)
            .await;

        if let Some(reply) = reply {
            if let Err(e) = chat.send_message(&message.conversation, &reply).await {
                tracing::warn!("failed to reply to {}: {}", message.conversation, e);
            }
        }
    }
}
