//! Chat message types.

use std::fmt;

/// Identifier of a chat conversation (a contact or a group).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationId(String);

impl ConversationId {
    /// Creates a conversation identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A text message received from the messaging transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Transport-assigned message identifier.
    pub id: String,
    /// Conversation the message arrived from.
    pub conversation: ConversationId,
    /// True if the message was sent by the bridge's own account.
    pub from_self: bool,
    /// Plain text body.
    pub text: String,
}

impl InboundMessage {
    /// Creates a message from another participant.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        conversation: impl Into<ConversationId>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            conversation: conversation.into(),
            from_self: false,
            text: text.into(),
        }
    }
}
