//! Projection of backend tasks into workspace sequences.

use serde::{Deserialize, Serialize};

use super::types::{Sequence, SequenceMessage, Task};

/// Subject used when a task carries no subject at all.
pub const DEFAULT_SUBJECT: &str = "Generated Outreach Email";
/// Body used when a task carries no body at all.
pub const DEFAULT_BODY: &str = "No Content Provided";

/// Which task shape wins when both carry a value.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPrecedence {
    /// `message.subject` / `message.body` first, then `email_subject` / `email_body`.
    #[default]
    MessageFirst,
    /// `email_subject` / `email_body` first, then `message.subject` / `message.body`.
    LegacyFirst,
}

/// Maps [`Task`] records to [`Sequence`] records.
///
/// Projection is total: every missing or empty field falls back to the other
/// shape and finally to [`DEFAULT_SUBJECT`] / [`DEFAULT_BODY`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Projector {
    precedence: FieldPrecedence,
}

impl Projector {
    /// Create a projector with the given precedence.
    #[must_use]
    pub const fn new(precedence: FieldPrecedence) -> Self {
        Self { precedence }
    }

    /// The precedence in use.
    #[must_use]
    pub const fn precedence(&self) -> FieldPrecedence {
        self.precedence
    }

    /// Project one task.
    #[must_use]
    pub fn project(&self, task: &Task) -> Sequence {
        let nested = task.message.as_ref();
        let nested_subject = nested.and_then(|m| m.subject.as_deref());
        let nested_body = nested.and_then(|m| m.body.as_deref());
        let legacy_subject = task.email_subject.as_deref();
        let legacy_body = task.email_body.as_deref();

        let (subject, body) = match self.precedence {
            FieldPrecedence::MessageFirst => (
                first_present(nested_subject, legacy_subject, DEFAULT_SUBJECT),
                first_present(nested_body, legacy_body, DEFAULT_BODY),
            ),
            FieldPrecedence::LegacyFirst => (
                first_present(legacy_subject, nested_subject, DEFAULT_SUBJECT),
                first_present(legacy_body, nested_body, DEFAULT_BODY),
            ),
        };

        Sequence {
            id: task.id,
            title: task.description.clone(),
            message: SequenceMessage::new(subject, body),
        }
    }

    /// Project a batch, preserving order and length.
    #[must_use]
    pub fn project_all(&self, tasks: &[Task]) -> Vec<Sequence> {
        tasks.iter().map(|task| self.project(task)).collect()
    }
}

/// Project one task with the default precedence.
#[must_use]
pub fn project_task(task: &Task) -> Sequence {
    Projector::default().project(task)
}

/// Project a batch with the default precedence.
#[must_use]
pub fn project_tasks(tasks: &[Task]) -> Vec<Sequence> {
    Projector::default().project_all(tasks)
}

// Empty strings count as missing.
fn first_present(primary: Option<&str>, secondary: Option<&str>, fallback: &str) -> String {
    primary
        .filter(|s| !s.is_empty())
        .or_else(|| secondary.filter(|s| !s.is_empty()))
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::types::TaskMessage;

    #[test]
    fn test_id_and_title_carried_over() {
        let sequence = project_task(&Task::new(42, "Reach out to Dana"));
        assert_eq!(sequence.id, 42);
        assert_eq!(sequence.title, "Reach out to Dana");
    }

    #[test]
    fn test_defaults_when_no_draft() {
        let sequence = project_task(&Task::new(1, "Empty"));
        assert_eq!(
            sequence.message,
            SequenceMessage::new("Generated Outreach Email", "No Content Provided")
        );
    }

    #[test]
    fn test_message_first_prefers_nested_fields() {
        let task = Task::new(1, "Both")
            .with_message("nested subject", "nested body")
            .with_legacy_email("legacy subject", "legacy body");
        let sequence = project_task(&task);
        assert_eq!(sequence.message.subject, "nested subject");
        assert_eq!(sequence.message.body, "nested body");
    }

    #[test]
    fn test_legacy_first_prefers_flat_fields() {
        let task = Task::new(1, "Both")
            .with_message("nested subject", "nested body")
            .with_legacy_email("legacy subject", "legacy body");
        let sequence = Projector::new(FieldPrecedence::LegacyFirst).project(&task);
        assert_eq!(sequence.message.subject, "legacy subject");
        assert_eq!(sequence.message.body, "legacy body");
    }

    #[test]
    fn test_falls_back_per_field() {
        let task = Task {
            id: 7,
            description: "Mixed".to_string(),
            message: Some(TaskMessage {
                subject: None,
                body: Some("nested body".to_string()),
            }),
            email_subject: Some("legacy subject".to_string()),
            email_body: None,
        };
        let sequence = project_task(&task);
        assert_eq!(sequence.message.subject, "legacy subject");
        assert_eq!(sequence.message.body, "nested body");
    }

    #[test]
    fn test_empty_strings_are_missing() {
        let task = Task::new(1, "Blank").with_message("", "").with_legacy_email("", "");
        let sequence = project_task(&task);
        assert_eq!(sequence.message.subject, DEFAULT_SUBJECT);
        assert_eq!(sequence.message.body, DEFAULT_BODY);
    }

    #[test]
    fn test_batch_preserves_order_and_length() {
        let tasks = vec![Task::new(3, "c"), Task::new(1, "a"), Task::new(2, "b")];
        let ids: Vec<i64> = project_tasks(&tasks).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert!(project_tasks(&[]).is_empty());
    }
}
