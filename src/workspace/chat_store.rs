//! Append-only chat log.

use crate::transport::{Emitter, TransportResult, USER_MESSAGE_EVENT};

use super::types::ChatMessage;

/// Chat log in arrival order. Entries are never edited or removed.
pub struct ChatStore {
    messages: Vec<ChatMessage>,
    emitter: Emitter,
}

impl ChatStore {
    /// Create an empty log that forwards local messages through `emitter`.
    #[must_use]
    pub const fn new(emitter: Emitter) -> Self {
        Self {
            messages: Vec::new(),
            emitter,
        }
    }

    /// Append a message typed by the user and send it to the backend.
    ///
    /// The entry stays in the log even when forwarding fails.
    ///
    /// # Errors
    /// Returns an error if the transport has been shut down.
    pub fn append_local(&mut self, text: impl Into<String>) -> TransportResult<()> {
        let text = text.into();
        self.messages.push(ChatMessage::user(text.clone()));
        self.emitter.emit(USER_MESSAGE_EVENT, text)
    }

    /// Append a message pushed by the assistant.
    pub fn append_remote(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::helix(text));
    }

    /// The log in arrival order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    #[test]
    fn test_local_then_remote_order() {
        let (emitter, _outbound) = Emitter::channel();
        let mut chat = ChatStore::new(emitter);

        chat.append_local("hello").unwrap();
        chat.append_remote("hi there");

        assert_eq!(
            chat.messages(),
            &[ChatMessage::user("hello"), ChatMessage::helix("hi there")]
        );
    }

    #[test]
    fn test_local_message_is_forwarded_verbatim() {
        let (emitter, mut outbound) = Emitter::channel();
        let mut chat = ChatStore::new(emitter);

        chat.append_local("  spaced <b>text</b> ").unwrap();

        let event = outbound.try_recv().unwrap();
        assert_eq!(event.name, "user_message");
        assert_eq!(event.payload, serde_json::json!("  spaced <b>text</b> "));
    }

    #[test]
    fn test_local_message_kept_when_transport_closed() {
        let (emitter, outbound) = Emitter::channel();
        drop(outbound);
        let mut chat = ChatStore::new(emitter);

        assert_eq!(chat.append_local("lost?"), Err(TransportError::Closed));
        assert_eq!(chat.len(), 1);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let (emitter, _outbound) = Emitter::channel();
        let mut chat = ChatStore::new(emitter);
        chat.append_remote("same");
        chat.append_remote("same");
        assert_eq!(chat.len(), 2);
    }
}
