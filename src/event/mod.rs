//! Event system for device notifications.
//!
//! Every decoded telemetry line is published twice: queued in order for the
//! bridge loop, which merges it into the snapshot, and broadcast to any
//! subscriber waiting for a specific reading.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use crate::types::{DecodedLine, Field};

/// Event types that can be dispatched.
#[derive(Debug, Clone)]
pub enum Event {
    /// Serial port opened.
    Connected { port: String },
    /// Serial port closed or failed.
    Disconnected { port: String },
    /// Telemetry line decoded.
    Line(DecodedLine),
}

/// A subscription to events.
pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receives the next event.
    ///
    /// Returns `None` once the dispatcher is gone.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("subscription lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Waits for the next event matching the filter, up to `timeout`.
    ///
    /// Returns `None` if the timeout expires or the channel is closed.
    pub async fn wait_for(&mut self, filter: &EventFilter, timeout: Duration) -> Option<Event> {
        tokio::select! {
            biased;
            result = async {
                loop {
                    let event = self.recv().await?;
                    if filter.matches(&event) {
                        return Some(event);
                    }
                }
            } => result,
            () = tokio::time::sleep(timeout) => None,
        }
    }
}

/// Subscription filter for specific readings.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Match decoded lines carrying any of these fields.
    pub fields: Option<Vec<Field>>,
}

impl EventFilter {
    /// Creates a filter for lines carrying any of the given fields.
    #[must_use]
    pub const fn fields(fields: Vec<Field>) -> Self {
        Self {
            fields: Some(fields),
        }
    }

    /// Checks if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        match (&self.fields, event) {
            (None, _) => true,
            (Some(fields), Event::Line(line)) => fields.iter().any(|&field| line.contains(field)),
            (Some(_), _) => false,
        }
    }
}

struct EventDispatcherInner {
    sender: broadcast::Sender<Event>,
}

/// Dispatches events to subscribers.
#[derive(Clone)]
pub struct EventDispatcher {
    inner: Arc<EventDispatcherInner>,
    event_tx: mpsc::Sender<Event>,
}

impl EventDispatcher {
    /// Creates a new event dispatcher.
    ///
    /// The returned receiver yields every queued event in order.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (sender, _) = broadcast::channel(capacity);
        let (event_tx, event_rx) = mpsc::channel(capacity);

        let inner = Arc::new(EventDispatcherInner { sender });

        (Self { inner, event_tx }, event_rx)
    }

    /// Dispatches an event to all subscribers.
    pub fn dispatch(&self, event: Event) {
        // No receivers is fine
        let _ = self.inner.sender.send(event);
    }

    /// Queues an event for processing.
    ///
    /// # Errors
    ///
    /// Returns an error if the event channel is closed.
    pub async fn queue(&self, event: Event) -> Result<(), mpsc::error::SendError<Event>> {
        self.event_tx.send(event).await
    }

    /// Broadcasts an event, then queues it for processing.
    ///
    /// # Errors
    ///
    /// Returns an error if the event channel is closed.
    pub async fn publish(&self, event: Event) -> crate::Result<()> {
        self.dispatch(event.clone());
        self.queue(event)
            .await
            .map_err(|_| crate::Error::ChannelSend)
    }

    /// Subscribes to broadcast events.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let receiver = self.inner.sender.subscribe();
        Subscription { receiver }
    }

    /// Waits for an event matching the filter with timeout.
    ///
    /// Only events dispatched after this call are considered; subscribe
    /// first with [`EventDispatcher::subscribe`] when the event may be
    /// triggered before waiting starts.
    pub async fn wait_for(&self, filter: EventFilter, timeout: Duration) -> Option<Event> {
        let mut subscription = self.subscribe();
        subscription.wait_for(&filter, timeout).await
    }
}
