//! Hook for running a sequence.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::api::RequestError;

use super::types::Sequence;

/// Result of running a sequence, as reported by the executor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Status label (`"logged"`, `"success"`, `"error"`, ...).
    #[serde(default)]
    pub status: String,
    /// Optional human-readable detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Any further fields returned by the backend.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Collaborator that actually runs a sequence.
#[async_trait]
pub trait SequenceExecutor: Send + Sync {
    /// Run the given sequence.
    ///
    /// # Errors
    /// Returns an error if the execution backend cannot be reached.
    async fn execute(&self, sequence: &Sequence) -> Result<ExecutionReport, RequestError>;
}

/// Executor that only records the request in the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingExecutor;

#[async_trait]
impl SequenceExecutor for LoggingExecutor {
    async fn execute(&self, sequence: &Sequence) -> Result<ExecutionReport, RequestError> {
        tracing::info!(id = sequence.id, title = %sequence.title, "Executing sequence");
        Ok(ExecutionReport {
            status: "logged".to_string(),
            message: None,
            extra: serde_json::Map::new(),
        })
    }
}
