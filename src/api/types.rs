//! Request and response bodies for the REST endpoints.

use serde::{Deserialize, Serialize};

use crate::workspace::{Task, WorkspacePayload};

/// Body of `POST /llm/outreach`.
#[derive(Debug, Serialize)]
pub struct OutreachRequest<'a> {
    /// Role being recruited for.
    pub role: &'a str,
    /// Tone or approach of the outreach.
    pub approach: &'a str,
}

/// Response of `POST /llm/outreach`.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct OutreachResponse {
    /// First message of the generated sequence.
    #[serde(rename = "initialMessage")]
    pub initial_message: String,
}

/// A recruiting candidate, body of `POST /candidate`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Candidate name.
    pub name: String,
    /// Role the candidate is considered for.
    pub role: String,
    /// Where the outreach stands (`"pending"`, `"contacted"`, ...).
    pub outreach_status: String,
}

/// Plain acknowledgement returned by write endpoints.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct Acknowledgement {
    /// Server message.
    pub message: String,
}

/// Body of `POST /message`.
#[derive(Debug, Serialize)]
pub struct MessageRequest<'a> {
    /// Chat text.
    pub message: &'a str,
}

/// Agent result returned by `POST /message`.
///
/// Same content the socket pushes as `ai_response` and `workspace_update`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
pub struct AgentReply {
    /// Chat part, if any.
    #[serde(default)]
    pub chat: Option<AgentChat>,
    /// Workspace part, if any.
    #[serde(default)]
    pub workspace: Option<AgentWorkspace>,
}

/// Workspace part of an [`AgentReply`].
///
/// The backend answers follow-up questions with `"workspace": {}`, which
/// must leave the current list alone.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
pub struct AgentWorkspace {
    /// New task batch, absent when the reply carries no workspace change.
    #[serde(default)]
    pub tasks: Option<Vec<Task>>,
}

impl AgentWorkspace {
    /// The batch to apply, if the reply carries one.
    #[must_use]
    pub fn into_payload(self) -> Option<WorkspacePayload> {
        self.tasks.map(|tasks| WorkspacePayload { tasks })
    }
}

/// Chat part of an [`AgentReply`].
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct AgentChat {
    /// Reply text.
    pub content: String,
}

/// Body of `POST /execute-task`.
#[derive(Debug, Serialize)]
pub struct ExecuteTaskRequest<'a> {
    /// Step description to run.
    #[serde(rename = "stepText")]
    pub step_text: &'a str,
}
