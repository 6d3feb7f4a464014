//! Client-side workspace state: outreach sequences and the chat log.
//!
//! - Task/sequence records and their projection
//! - Sequence store (replace, edit, delete, execute)
//! - Chat store
//! - Safe rendering of draft bodies

pub mod chat_store;
pub mod executor;
pub mod projector;
pub mod sanitize;
pub mod sequence_store;
pub mod types;

pub use chat_store::ChatStore;
pub use executor::{ExecutionReport, LoggingExecutor, SequenceExecutor};
pub use projector::{
    DEFAULT_BODY, DEFAULT_SUBJECT, FieldPrecedence, Projector, project_task, project_tasks,
};
pub use sanitize::{body_text, sanitize_body};
pub use sequence_store::SequenceStore;
pub use types::{
    ChatMessage, HELIX_SENDER, Sequence, SequenceMessage, Task, TaskMessage, USER_SENDER,
    WorkspacePayload,
};
