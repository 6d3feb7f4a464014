//! A mounted Helix session: transport subscriptions feeding the workspace.
//!
//! Pushed events are queued into an inbox and applied one at a time by
//! whoever owns the session, so store mutations never interleave.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::api::{AgentReply, AgentWorkspace, RequestError};
use crate::transport::{
    AI_RESPONSE_EVENT, Subscription, TransportHandle, TransportResult, WORKSPACE_UPDATE_EVENT,
};
use crate::workspace::{
    ChatMessage, ChatStore, ExecutionReport, Projector, SequenceExecutor, SequenceMessage,
    SequenceStore, Task, WorkspacePayload,
};

/// A pushed event waiting to be applied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Inbound {
    /// `ai_response`.
    AiResponse(String),
    /// `workspace_update`.
    WorkspaceUpdate(WorkspacePayload),
}

/// What applying an [`Inbound`] changed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Applied {
    /// A message was appended to the chat log.
    Chat(ChatMessage),
    /// The sequence list was replaced; holds the new length.
    Workspace(usize),
}

/// Chat log and sequence list kept in sync with one transport.
///
/// Subscriptions are registered by [`mount`](Self::mount) and released when
/// the session is dropped.
pub struct Session {
    sequences: SequenceStore,
    chat: ChatStore,
    inbox: mpsc::UnboundedReceiver<Inbound>,
    subscriptions: Vec<Subscription>,
}

impl Session {
    /// Subscribe to `transport` and start with an empty workspace.
    #[must_use]
    pub fn mount(
        transport: &TransportHandle,
        projector: Projector,
        executor: Arc<dyn SequenceExecutor>,
    ) -> Self {
        let (tx, inbox) = mpsc::unbounded_channel();

        let chat_tx = tx.clone();
        let ai_response = transport.subscribe(AI_RESPONSE_EVENT, move |text: String| {
            let _ = chat_tx.send(Inbound::AiResponse(text));
        });
        let workspace_update =
            transport.subscribe(WORKSPACE_UPDATE_EVENT, move |payload: WorkspacePayload| {
                let _ = tx.send(Inbound::WorkspaceUpdate(payload));
            });

        Self {
            sequences: SequenceStore::new(projector, executor),
            chat: ChatStore::new(transport.emitter()),
            inbox,
            subscriptions: vec![ai_response, workspace_update],
        }
    }

    /// Seed the workspace with an initial task list.
    pub fn load_tasks(&mut self, tasks: &[Task]) {
        self.sequences.replace_all(tasks);
    }

    /// Apply one pushed event to the stores.
    pub fn apply(&mut self, inbound: Inbound) -> Applied {
        match inbound {
            Inbound::AiResponse(text) => {
                debug!(len = text.len(), "Applying assistant reply");
                self.chat.append_remote(text.clone());
                Applied::Chat(ChatMessage::helix(text))
            }
            Inbound::WorkspaceUpdate(payload) => {
                self.sequences.replace_all(&payload.tasks);
                Applied::Workspace(self.sequences.len())
            }
        }
    }

    /// Apply an agent result obtained over HTTP, chat part first.
    pub fn apply_reply(&mut self, reply: AgentReply) -> Vec<Applied> {
        let mut applied = Vec::new();
        if let Some(chat) = reply.chat {
            applied.push(self.apply(Inbound::AiResponse(chat.content)));
        }
        if let Some(payload) = reply.workspace.and_then(AgentWorkspace::into_payload) {
            applied.push(self.apply(Inbound::WorkspaceUpdate(payload)));
        }
        applied
    }

    /// Wait for the next pushed event and apply it.
    ///
    /// Returns `None` once the transport has gone away for good.
    pub async fn next_update(&mut self) -> Option<Applied> {
        let inbound = self.inbox.recv().await?;
        Some(self.apply(inbound))
    }

    /// Apply every event already queued, without waiting.
    pub fn drain_pending(&mut self) -> Vec<Applied> {
        let mut applied = Vec::new();
        while let Ok(inbound) = self.inbox.try_recv() {
            applied.push(self.apply(inbound));
        }
        applied
    }

    /// Record a user message and send it to the backend.
    ///
    /// # Errors
    /// Returns an error if the transport has shut down.
    pub fn send_chat(&mut self, text: impl Into<String>) -> TransportResult<()> {
        self.chat.append_local(text)
    }

    /// Replace the draft of sequence `id`. Returns `false` if there is none.
    pub fn edit_sequence(&mut self, id: i64, message: SequenceMessage) -> bool {
        self.sequences.update(id, message)
    }

    /// Delete sequence `id`. Returns `false` if there is none.
    pub fn delete_sequence(&mut self, id: i64) -> bool {
        self.sequences.remove(id).is_some()
    }

    /// Run sequence `id`.
    ///
    /// # Errors
    /// Propagates executor failures.
    pub async fn execute_sequence(
        &self,
        id: i64,
    ) -> Result<Option<ExecutionReport>, RequestError> {
        self.sequences.execute(id).await
    }

    /// The sequence list.
    #[must_use]
    pub const fn sequences(&self) -> &SequenceStore {
        &self.sequences
    }

    /// The chat log.
    #[must_use]
    pub const fn chat(&self) -> &ChatStore {
        &self.chat
    }

    /// Number of transport subscriptions held.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::TransportConfig;
    use crate::transport::{Connection, Connector, ReconnectPolicy, TransportError};
    use crate::workspace::LoggingExecutor;
    use async_trait::async_trait;
    use url::Url;

    struct Offline;

    #[async_trait]
    impl Connector for Offline {
        async fn connect(&self, _endpoint: &Url) -> TransportResult<Connection> {
            Err(TransportError::Connect("offline".into()))
        }
    }

    fn offline_transport() -> TransportHandle {
        let config = TransportConfig {
            reconnect: ReconnectPolicy::disabled(),
            connect_timeout: Duration::from_secs(1),
            ..TransportConfig::default()
        };
        TransportHandle::spawn_with(&config, Arc::new(Offline)).unwrap()
    }

    fn mount(transport: &TransportHandle) -> Session {
        Session::mount(transport, Projector::default(), Arc::new(LoggingExecutor))
    }

    #[tokio::test]
    async fn test_mount_registers_once_and_drop_releases() {
        let transport = offline_transport();
        let session = mount(&transport);
        assert_eq!(session.subscription_count(), 2);
        assert_eq!(transport.subscriber_count(AI_RESPONSE_EVENT), 1);
        assert_eq!(transport.subscriber_count(WORKSPACE_UPDATE_EVENT), 1);

        drop(session);
        assert_eq!(transport.subscriber_count(AI_RESPONSE_EVENT), 0);
        assert_eq!(transport.subscriber_count(WORKSPACE_UPDATE_EVENT), 0);
    }

    #[tokio::test]
    async fn test_chat_order_local_then_remote() {
        let transport = offline_transport();
        let mut session = mount(&transport);

        session.send_chat("hello").unwrap();
        session.apply(Inbound::AiResponse("hi there".to_string()));

        assert_eq!(
            session.chat().messages(),
            &[ChatMessage::user("hello"), ChatMessage::helix("hi there")]
        );
    }

    #[tokio::test]
    async fn test_workspace_update_replaces_list() {
        let transport = offline_transport();
        let mut session = mount(&transport);
        session.load_tasks(&[Task::new(1, "old"), Task::new(2, "older")]);

        let applied = session.apply(Inbound::WorkspaceUpdate(WorkspacePayload {
            tasks: vec![Task::new(5, "new").with_legacy_email("Subject", "Body")],
        }));

        assert_eq!(applied, Applied::Workspace(1));
        let sequence = session.sequences().get(5).unwrap();
        assert_eq!(sequence.message, SequenceMessage::new("Subject", "Body"));
        assert!(session.sequences().get(1).is_none());
    }

    #[tokio::test]
    async fn test_edit_and_delete_are_local() {
        let transport = offline_transport();
        let mut session = mount(&transport);
        session.load_tasks(&[Task::new(1, "one"), Task::new(2, "two")]);

        assert!(session.edit_sequence(1, SequenceMessage::new("s", "b")));
        assert!(!session.edit_sequence(9, SequenceMessage::new("s", "b")));
        assert!(session.delete_sequence(2));
        assert!(!session.delete_sequence(2));
        assert_eq!(session.sequences().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_reply_chat_then_workspace() {
        let transport = offline_transport();
        let mut session = mount(&transport);

        let reply: AgentReply = serde_json::from_str(
            r#"{"chat": {"content": "Drafted two emails"}, "workspace": {"tasks": [{"id": 1, "description": "a"}, {"id": 2, "description": "b"}]}}"#,
        )
        .unwrap();
        let applied = session.apply_reply(reply);

        assert_eq!(
            applied,
            vec![
                Applied::Chat(ChatMessage::helix("Drafted two emails")),
                Applied::Workspace(2)
            ]
        );
    }

    #[tokio::test]
    async fn test_follow_up_question_keeps_workspace() {
        let transport = offline_transport();
        let mut session = mount(&transport);
        session.load_tasks(&[Task::new(1, "one"), Task::new(2, "two")]);

        let reply: AgentReply = serde_json::from_str(
            r#"{"type": "question", "chat": {"type": "question", "content": "What is the location?"}, "workspace": {}}"#,
        )
        .unwrap();
        let applied = session.apply_reply(reply);

        assert_eq!(
            applied,
            vec![Applied::Chat(ChatMessage::helix("What is the location?"))]
        );
        assert_eq!(session.sequences().len(), 2);
    }

    #[tokio::test]
    async fn test_explicit_empty_batch_clears_workspace() {
        let transport = offline_transport();
        let mut session = mount(&transport);
        session.load_tasks(&[Task::new(1, "one")]);

        let reply: AgentReply = serde_json::from_str(r#"{"workspace": {"tasks": []}}"#).unwrap();
        assert_eq!(session.apply_reply(reply), vec![Applied::Workspace(0)]);
        assert!(session.sequences().is_empty());
    }

    #[tokio::test]
    async fn test_drain_pending_is_empty_without_events() {
        let transport = offline_transport();
        let mut session = mount(&transport);
        assert!(session.drain_pending().is_empty());
    }

    #[tokio::test]
    async fn test_execute_unknown_sequence() {
        let transport = offline_transport();
        let session = mount(&transport);
        assert!(session.execute_sequence(3).await.unwrap().is_none());
    }
}
