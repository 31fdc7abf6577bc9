//! crates/fitness_core/src/queue.rs
//!
//! Completions applied locally before the server has acknowledged them, plus
//! whole-item completion marks that could not be delivered yet.

use std::collections::BTreeSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Pending,
    Confirmed,
}

#[derive(Debug, Clone)]
pub struct QueuedCompletion {
    pub item_id: Uuid,
    pub exercise_id: String,
    pub status: SyncStatus,
    pub attempts: u32,
}

/// Ordered log of completions with a pending/confirmed flag each.
#[derive(Debug, Default)]
pub struct CompletionQueue {
    entries: Vec<QueuedCompletion>,
    item_marks: BTreeSet<Uuid>,
}

impl CompletionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pending entry, or flips an existing entry for the same exercise
    /// back to pending.
    pub fn enqueue(&mut self, item_id: Uuid, exercise_id: &str) {
        if let Some(entry) = self.find_mut(item_id, exercise_id) {
            entry.status = SyncStatus::Pending;
            return;
        }
        self.entries.push(QueuedCompletion {
            item_id,
            exercise_id: exercise_id.to_string(),
            status: SyncStatus::Pending,
            attempts: 0,
        });
    }

    pub fn confirm(&mut self, item_id: Uuid, exercise_id: &str) {
        if let Some(entry) = self.find_mut(item_id, exercise_id) {
            entry.status = SyncStatus::Confirmed;
            entry.attempts += 1;
        }
    }

    /// Records a failed delivery; the entry stays pending for replay.
    pub fn record_failure(&mut self, item_id: Uuid, exercise_id: &str) {
        if let Some(entry) = self.find_mut(item_id, exercise_id) {
            entry.attempts += 1;
        }
    }

    pub fn status(&self, item_id: Uuid, exercise_id: &str) -> Option<SyncStatus> {
        self.find(item_id, exercise_id).map(|e| e.status)
    }

    /// Delivery attempts made so far for one completion.
    pub fn attempts(&self, item_id: Uuid, exercise_id: &str) -> u32 {
        self.find(item_id, exercise_id).map_or(0, |e| e.attempts)
    }

    /// Remembers that the whole-item mark for `item_id` still has to be sent.
    pub fn defer_item_mark(&mut self, item_id: Uuid) {
        self.item_marks.insert(item_id);
    }

    pub fn confirm_item_mark(&mut self, item_id: Uuid) {
        self.item_marks.remove(&item_id);
    }

    pub fn pending_item_marks(&self) -> Vec<Uuid> {
        self.item_marks.iter().copied().collect()
    }

    /// Pending entries in the order they were queued.
    pub fn pending(&self) -> Vec<(Uuid, String)> {
        self.entries
            .iter()
            .filter(|e| e.status == SyncStatus::Pending)
            .map(|e| (e.item_id, e.exercise_id.clone()))
            .collect()
    }

    pub fn pending_ids_for(&self, item_id: Uuid) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|e| e.item_id == item_id && e.status == SyncStatus::Pending)
            .map(|e| e.exercise_id.clone())
            .collect()
    }

    /// Forgets the entries for `exercise_ids` of one item, whatever their status.
    pub fn discard(&mut self, item_id: Uuid, exercise_ids: &BTreeSet<String>) {
        self.entries
            .retain(|e| !(e.item_id == item_id && exercise_ids.contains(&e.exercise_id)));
    }

    /// Forgets every completion of one item and its deferred item mark.
    pub fn discard_item(&mut self, item_id: Uuid) {
        self.entries.retain(|e| e.item_id != item_id);
        self.item_marks.remove(&item_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, item_id: Uuid, exercise_id: &str) -> Option<&QueuedCompletion> {
        self.entries
            .iter()
            .find(|e| e.item_id == item_id && e.exercise_id == exercise_id)
    }

    fn find_mut(&mut self, item_id: Uuid, exercise_id: &str) -> Option<&mut QueuedCompletion> {
        self.entries
            .iter_mut()
            .find(|e| e.item_id == item_id && e.exercise_id == exercise_id)
    }
}
