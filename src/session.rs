//! Device session management.
//!
//! At most one serial session exists at a time. A new `connect` replaces the
//! current session, closing it first.

use std::fmt;

use crate::error::Result;
use crate::event::{Event, EventDispatcher, Subscription};
use crate::protocol::encode_line;
use crate::transport::{Connector, SerialConfig, Transport};

/// Lifecycle state of a device session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Port is being opened.
    Connecting,
    /// Port is open and lines are flowing.
    Connected,
    /// Port failed to open or has closed.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed => "closed",
        })
    }
}

/// One serial session with the rover.
pub struct DeviceSession<T> {
    config: SerialConfig,
    state: SessionState,
    transport: T,
}

impl<T> DeviceSession<T> {
    /// Returns the port identifier.
    #[must_use]
    pub fn port(&self) -> &str {
        &self.config.port
    }

    /// Returns the baud rate.
    #[must_use]
    pub const fn baud_rate(&self) -> u32 {
        self.config.baud_rate
    }

    /// Returns the session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }
}

/// Owns the device session and its transport.
pub struct DeviceSessionManager<C: Connector> {
    connector: C,
    events: EventDispatcher,
    session: Option<DeviceSession<C::Transport>>,
}

impl<C: Connector> DeviceSessionManager<C> {
    /// Creates a manager with no session.
    #[must_use]
    pub const fn new(connector: C, events: EventDispatcher) -> Self {
        Self {
            connector,
            events,
            session: None,
        }
    }

    /// Opens a session, replacing the current one.
    ///
    /// The session is recorded even if the port fails to open; it is then
    /// left in [`SessionState::Closed`] and writes to it fail.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the port could not be opened.
    pub async fn connect(&mut self, config: SerialConfig) -> Result<()> {
        self.close_current().await;

        let transport = self.connector.create(config.clone(), self.events.clone());
        let session = self.session.insert(DeviceSession {
            config,
            state: SessionState::Connecting,
            transport,
        });

        match session.transport.connect().await {
            Ok(()) => {
                session.state = SessionState::Connected;
                self.events.dispatch(Event::Connected {
                    port: session.config.port.clone(),
                });
                Ok(())
            }
            Err(e) => {
                session.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    async fn close_current(&mut self) {
        if let Some(mut previous) = self.session.take() {
            tracing::info!("replacing device session on {}", previous.port());
            if let Err(e) = previous.transport.disconnect().await {
                tracing::warn!("failed to close {}: {}", previous.port(), e);
            }
        }
    }

    /// Writes one newline-terminated token to the current session.
    ///
    /// Returns `Ok(false)` without writing if there is no session.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the write fails.
    pub async fn send(&mut self, token: &str) -> Result<bool> {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!("no device session, dropping {:?}", token);
            return Ok(false);
        };
        session.transport.send(encode_line(token)).await?;
        Ok(true)
    }

    /// Returns the current session, if any.
    #[must_use]
    pub const fn session(&self) -> Option<&DeviceSession<C::Transport>> {
        self.session.as_ref()
    }

    /// Returns true if a session exists, whatever its state.
    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Returns true if the current session's port is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.transport.is_connected())
    }

    /// Marks the session on `port` as closed after its read loop ended.
    pub fn mark_closed(&mut self, port: &str) {
        if let Some(session) = self.session.as_mut().filter(|s| s.port() == port) {
            session.state = SessionState::Closed;
        }
    }

    /// Subscribes to device events.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    /// Closes the current session, if any.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            session.transport.disconnect().await?;
            self.events.dispatch(Event::Disconnected {
                port: session.config.port,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::RecordingConnector;

    fn manager(connector: RecordingConnector) -> DeviceSessionManager<RecordingConnector> {
        let (events, _rx) = EventDispatcher::new(16);
        DeviceSessionManager::new(connector, events)
    }

    #[tokio::test]
    async fn test_send_without_session_is_noop() {
        let connector = RecordingConnector::default();
        let mut sessions = manager(connector.clone());

        assert!(!sessions.send("alarmas_on").await.unwrap());
        assert!(connector.writes().is_empty());
    }

    #[tokio::test]
    async fn test_connect_and_send() {
        let connector = RecordingConnector::default();
        let mut sessions = manager(connector.clone());

        sessions.connect(SerialConfig::new("COM3")).await.unwrap();
        let session = sessions.session().unwrap();
        assert_eq!(session.port(), "COM3");
        assert_eq!(session.baud_rate(), 9600);
        assert_eq!(session.state(), SessionState::Connected);

        assert!(sessions.send("seguir_luz").await.unwrap());
        assert_eq!(
            connector.writes(),
            vec![("COM3".to_owned(), bytes::Bytes::from_static(b"seguir_luz\n"))]
        );
    }

    #[tokio::test]
    async fn test_reconnect_closes_previous_session() {
        let connector = RecordingConnector::default();
        let mut sessions = manager(connector.clone());

        sessions.connect(SerialConfig::new("COM1")).await.unwrap();
        sessions
            .connect(SerialConfig::new("COM2").baud_rate(115_200))
            .await
            .unwrap();

        assert_eq!(*connector.closed.lock().unwrap(), vec!["COM1".to_owned()]);
        assert_eq!(sessions.session().unwrap().port(), "COM2");

        sessions.send("no_seguir").await.unwrap();
        assert_eq!(connector.writes()[0].0, "COM2");
    }

    #[tokio::test]
    async fn test_failed_open_keeps_closed_session() {
        let connector = RecordingConnector {
            fail_open: true,
            ..RecordingConnector::default()
        };
        let mut sessions = manager(connector.clone());

        assert!(sessions.connect(SerialConfig::new("COM3")).await.is_err());
        assert!(sessions.has_session());
        assert!(!sessions.is_connected());
        assert_eq!(sessions.session().unwrap().state(), SessionState::Closed);
        assert!(sessions.send("alarmas_on").await.is_err());
    }

    #[tokio::test]
    async fn test_mark_closed_matches_port() {
        let mut sessions = manager(RecordingConnector::default());
        sessions.connect(SerialConfig::new("COM3")).await.unwrap();

        sessions.mark_closed("COM1");
        assert_eq!(sessions.session().unwrap().state(), SessionState::Connected);

        sessions.mark_closed("COM3");
        assert_eq!(sessions.session().unwrap().state(), SessionState::Closed);
    }
}
