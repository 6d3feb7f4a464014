//! Sequence executor backed by `POST /execute-task`.

use async_trait::async_trait;

use crate::workspace::{ExecutionReport, Sequence, SequenceExecutor};

use super::{HelixApi, RequestError};

/// Runs a sequence by sending its title as the step text.
#[derive(Clone, Debug)]
pub struct HttpExecutor {
    api: HelixApi,
}

impl HttpExecutor {
    /// Create an executor using `api`.
    #[must_use]
    pub const fn new(api: HelixApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SequenceExecutor for HttpExecutor {
    async fn execute(&self, sequence: &Sequence) -> Result<ExecutionReport, RequestError> {
        tracing::info!(id = sequence.id, title = %sequence.title, "Executing sequence on backend");
        self.api.execute_task(&sequence.title).await
    }
}
