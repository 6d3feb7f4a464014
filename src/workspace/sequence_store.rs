//! In-memory list of outreach sequences shown in the workspace.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::api::RequestError;

use super::executor::{ExecutionReport, LoggingExecutor, SequenceExecutor};
use super::projector::Projector;
use super::types::{Sequence, SequenceMessage, Task};

/// Ordered sequence list keyed by sequence id.
///
/// Edits and deletions only touch the local copy; the next task batch
/// replaces everything.
pub struct SequenceStore {
    projector: Projector,
    sequences: Vec<Sequence>,
    executor: Arc<dyn SequenceExecutor>,
}

impl Default for SequenceStore {
    fn default() -> Self {
        Self::new(Projector::default(), Arc::new(LoggingExecutor))
    }
}

impl SequenceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(projector: Projector, executor: Arc<dyn SequenceExecutor>) -> Self {
        Self {
            projector,
            sequences: Vec::new(),
            executor,
        }
    }

    /// Replace the whole list with the projection of `tasks`.
    ///
    /// Order follows the input. When an id repeats, the last task wins and
    /// takes the position of the first occurrence.
    pub fn replace_all(&mut self, tasks: &[Task]) {
        let mut positions: HashMap<i64, usize> = HashMap::with_capacity(tasks.len());
        let mut sequences: Vec<Sequence> = Vec::with_capacity(tasks.len());

        for sequence in self.projector.project_all(tasks) {
            if let Some(&index) = positions.get(&sequence.id) {
                debug!(id = sequence.id, "Duplicate sequence id in batch, keeping last");
                sequences[index] = sequence;
            } else {
                positions.insert(sequence.id, sequences.len());
                sequences.push(sequence);
            }
        }

        debug!(count = sequences.len(), "Replaced workspace sequences");
        self.sequences = sequences;
    }

    /// Replace the message of the sequence with `id`.
    ///
    /// Returns `false` and leaves the list untouched when no sequence matches.
    pub fn update(&mut self, id: i64, message: SequenceMessage) -> bool {
        match self.sequences.iter_mut().find(|s| s.id == id) {
            Some(sequence) => {
                sequence.message = message;
                true
            }
            None => {
                debug!(id, "Ignoring update for unknown sequence");
                false
            }
        }
    }

    /// Remove the sequence with `id`, returning it.
    pub fn remove(&mut self, id: i64) -> Option<Sequence> {
        let index = self.sequences.iter().position(|s| s.id == id)?;
        Some(self.sequences.remove(index))
    }

    /// Run the sequence with `id` through the configured executor.
    ///
    /// Returns `Ok(None)` when no sequence matches.
    ///
    /// # Errors
    /// Propagates executor failures.
    pub async fn execute(&self, id: i64) -> Result<Option<ExecutionReport>, RequestError> {
        let Some(sequence) = self.get(id) else {
            debug!(id, "Ignoring execute for unknown sequence");
            return Ok(None);
        };
        self.executor.execute(sequence).await.map(Some)
    }

    /// Look up a sequence by id.
    #[must_use]
    pub fn get(&self, id: i64) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.id == id)
    }

    /// All sequences in display order.
    #[must_use]
    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Number of sequences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn seeded() -> SequenceStore {
        let mut store = SequenceStore::default();
        store.replace_all(&[
            Task::new(1, "first").with_message("s1", "b1"),
            Task::new(2, "second").with_message("s2", "b2"),
            Task::new(3, "third").with_message("s3", "b3"),
        ]);
        store
    }

    fn ids(store: &SequenceStore) -> Vec<i64> {
        store.sequences().iter().map(|s| s.id).collect()
    }

    #[test]
    fn test_replace_all_empty() {
        let mut store = seeded();
        store.replace_all(&[]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_replace_all_replaces_not_merges() {
        let mut store = seeded();
        store.replace_all(&[Task::new(9, "only")]);
        assert_eq!(ids(&store), vec![9]);
    }

    #[test]
    fn test_replace_all_duplicate_ids_last_wins_first_position() {
        let mut store = SequenceStore::default();
        store.replace_all(&[
            Task::new(1, "old"),
            Task::new(2, "two"),
            Task::new(1, "new"),
        ]);
        assert_eq!(ids(&store), vec![1, 2]);
        assert_eq!(store.get(1).unwrap().title, "new");
    }

    #[test]
    fn test_update_existing() {
        let mut store = seeded();
        assert!(store.update(2, SequenceMessage::new("edited", "<p>edited</p>")));
        assert_eq!(store.get(2).unwrap().message.subject, "edited");
        assert_eq!(ids(&store), vec![1, 2, 3]);
    }

    #[test]
    fn test_update_unknown_id_leaves_list_unchanged() {
        let mut store = seeded();
        let before = store.sequences().to_vec();
        assert!(!store.update(99, SequenceMessage::new("x", "y")));
        assert_eq!(store.sequences(), before.as_slice());
    }

    #[test]
    fn test_remove_exactly_one() {
        let mut store = seeded();
        let removed = store.remove(2).unwrap();
        assert_eq!(removed.title, "second");
        assert_eq!(ids(&store), vec![1, 3]);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut store = seeded();
        assert!(store.remove(42).is_none());
        assert_eq!(ids(&store), vec![1, 2, 3]);
    }

    struct CountingExecutor(AtomicUsize);

    #[async_trait]
    impl SequenceExecutor for CountingExecutor {
        async fn execute(&self, sequence: &Sequence) -> Result<ExecutionReport, RequestError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(ExecutionReport {
                status: "ran".to_string(),
                message: Some(sequence.title.clone()),
                ..ExecutionReport::default()
            })
        }
    }

    #[tokio::test]
    async fn test_execute_delegates_to_executor() {
        let executor = Arc::new(CountingExecutor(AtomicUsize::new(0)));
        let mut store = SequenceStore::new(Projector::default(), executor.clone());
        store.replace_all(&[Task::new(5, "run me")]);

        let report = store.execute(5).await.unwrap().unwrap();
        assert_eq!(report.message.as_deref(), Some("run me"));

        assert!(store.execute(6).await.unwrap().is_none());
        assert_eq!(executor.0.load(Ordering::SeqCst), 1);
    }
}
