//! Records exchanged with the backend and held by the workspace.

use serde::{Deserialize, Deserializer, Serialize};

/// Sender label for messages typed by the local user.
pub const USER_SENDER: &str = "User";
/// Sender label for messages pushed by the assistant.
pub const HELIX_SENDER: &str = "Helix";

/// A backend-supplied unit of work.
///
/// Two historical payload shapes are accepted: a nested `message` object and
/// the flat `email_subject` / `email_body` pair.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier, reused as the sequence id.
    pub id: i64,
    /// Human-readable description, shown as the sequence title.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Draft email in the current shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<TaskMessage>,
    /// Draft subject in the legacy shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_subject: Option<String>,
    /// Draft body in the legacy shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_body: Option<String>,
}

impl Task {
    /// Create a task with only an id and description.
    #[must_use]
    pub fn new(id: i64, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            ..Self::default()
        }
    }

    /// Attach a draft in the current nested shape.
    #[must_use]
    pub fn with_message(mut self, subject: impl Into<String>, body: impl Into<String>) -> Self {
        self.message = Some(TaskMessage {
            subject: Some(subject.into()),
            body: Some(body.into()),
        });
        self
    }

    /// Attach a draft in the legacy flat shape.
    #[must_use]
    pub fn with_legacy_email(
        mut self,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        self.email_subject = Some(subject.into());
        self.email_body = Some(body.into());
        self
    }
}

/// Nested draft carried by a [`Task`]; both parts may be missing.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    /// Draft subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Draft body (HTML).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Subject and body of an outreach email draft.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SequenceMessage {
    /// Email subject.
    pub subject: String,
    /// Email body, as markup supplied by the backend.
    pub body: String,
}

impl SequenceMessage {
    /// Create a message from its parts.
    #[must_use]
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Display model for one outreach draft in the workspace.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    /// Identifier, equal to the originating task id.
    pub id: i64,
    /// Title, equal to the originating task description.
    pub title: String,
    /// The draft itself.
    pub message: SequenceMessage,
}

/// One entry of the chat log.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote it ([`USER_SENDER`] or [`HELIX_SENDER`]).
    pub sender: String,
    /// Message text.
    pub text: String,
}

impl ChatMessage {
    /// A message typed by the local user.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: USER_SENDER.to_string(),
            text: text.into(),
        }
    }

    /// A message pushed by the assistant.
    #[must_use]
    pub fn helix(text: impl Into<String>) -> Self {
        Self {
            sender: HELIX_SENDER.to_string(),
            text: text.into(),
        }
    }
}

/// Payload of the `workspace_update` event.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct WorkspacePayload {
    /// The new task batch; replaces the current list.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tasks: Vec<Task>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_accepts_nested_shape() {
        let task: Task = serde_json::from_str(
            r#"{"id": 1, "description": "Intro", "message": {"subject": "Hi", "body": "<p>Hello</p>"}}"#,
        )
        .unwrap();
        assert_eq!(task, Task::new(1, "Intro").with_message("Hi", "<p>Hello</p>"));
    }

    #[test]
    fn test_task_accepts_legacy_shape() {
        let task: Task = serde_json::from_str(
            r#"{"id": 2, "description": "Follow up", "email_subject": "Re: Hi", "email_body": "Ping"}"#,
        )
        .unwrap();
        assert_eq!(task.email_subject.as_deref(), Some("Re: Hi"));
        assert_eq!(task.email_body.as_deref(), Some("Ping"));
        assert!(task.message.is_none());
    }

    #[test]
    fn test_task_tolerates_nulls_and_partial_message() {
        let task: Task = serde_json::from_str(
            r#"{"id": 3, "description": null, "message": {"body": "only body"}, "email_subject": null}"#,
        )
        .unwrap();
        assert_eq!(task.description, "");
        assert_eq!(task.message.unwrap().subject, None);
        assert!(task.email_subject.is_none());
    }

    #[test]
    fn test_workspace_payload_without_tasks() {
        let payload: WorkspacePayload = serde_json::from_str("{}").unwrap();
        assert!(payload.tasks.is_empty());
    }

    #[test]
    fn test_chat_message_senders() {
        assert_eq!(ChatMessage::user("hello").sender, "User");
        assert_eq!(ChatMessage::helix("hi").sender, "Helix");
    }
}
