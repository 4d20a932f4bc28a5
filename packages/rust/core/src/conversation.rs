//! Append-only conversation store for one chat session.

use docchat_shared::{Message, Role, SessionId};

/// Ordered log of role-tagged messages. Messages are never edited or removed.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    id: SessionId,
    messages: Vec<Message>,
}

impl Conversation {
    /// An empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// A conversation opened by one assistant welcome message.
    pub fn with_welcome(welcome: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.append(Message::assistant(welcome));
        conversation
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Every message in append order.
    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    /// Content of the most recent user message.
    pub fn last_question(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
