//! Sender-side per-receiver state table and the two quorum predicates that
//! drive generation advancement.

use ahash::AHashMap;

/// A receiver's progress within the current generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// No feedback observed yet this generation.
    Pending,
    /// Reported a non-zero deficit; awaiting repair and re-report.
    NeedsMore,
    /// Acknowledged completion of this generation.
    Complete,
}

/// Tracks every enrolled receiver's state for the generation currently in
/// flight. Entries are only ever added during enrollment; the map is reset
/// to all-`Pending` at the start of every generation.
#[derive(Debug, Default)]
pub struct ReceiverTable {
    states: AHashMap<u32, ReceiverState>,
}

impl ReceiverTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a receiver, enrolled in `Pending` state. A no-op if already
    /// present (duplicate enrollment is idempotent).
    pub fn enroll(&mut self, receiver_id: u32) {
        self.states.entry(receiver_id).or_insert(ReceiverState::Pending);
    }

    /// Resets every known receiver to `Pending` for a new generation.
    pub fn reset_for_new_generation(&mut self) {
        for state in self.states.values_mut() {
            *state = ReceiverState::Pending;
        }
    }

    /// Records that `receiver_id` reported a deficit.
    pub fn mark_needs_more(&mut self, receiver_id: u32) {
        self.states.insert(receiver_id, ReceiverState::NeedsMore);
    }

    /// Records that `receiver_id` acknowledged completion.
    pub fn mark_complete(&mut self, receiver_id: u32) {
        self.states.insert(receiver_id, ReceiverState::Complete);
    }

    /// Resets every `NeedsMore` receiver back to `Pending` after a repair
    /// round has been sent, so they are given a fresh chance to report in.
    pub fn reset_needs_more_to_pending(&mut self) {
        for state in self.states.values_mut() {
            if *state == ReceiverState::NeedsMore {
                *state = ReceiverState::Pending;
            }
        }
    }

    /// No receiver is `Pending`: every enrolled receiver has reported in
    /// this round, one way or another.
    #[must_use]
    pub fn is_quorum_fresh(&self) -> bool {
        !self.states.values().any(|s| *s == ReceiverState::Pending)
    }

    /// Every enrolled receiver is `Complete`.
    #[must_use]
    pub fn is_quorum_complete(&self) -> bool {
        self.states.values().all(|s| *s == ReceiverState::Complete)
    }

    /// Whether any receiver currently needs more symbols.
    #[must_use]
    pub fn any_needs_more(&self) -> bool {
        self.states.values().any(|s| *s == ReceiverState::NeedsMore)
    }

    /// Number of enrolled receivers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no receiver has enrolled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_table_is_quorum_complete_vacuously() {
        let table = ReceiverTable::new();
        assert!(table.is_quorum_fresh());
        assert!(table.is_quorum_complete());
    }

    #[test]
    fn pending_blocks_quorum_fresh() {
        let mut table = ReceiverTable::new();
        table.enroll(1);
        assert!(!table.is_quorum_fresh());
        table.mark_complete(1);
        assert!(table.is_quorum_fresh());
        assert!(table.is_quorum_complete());
    }

    #[test]
    fn needs_more_blocks_quorum_complete_but_not_fresh() {
        let mut table = ReceiverTable::new();
        table.enroll(1);
        table.enroll(2);
        table.mark_needs_more(1);
        table.mark_complete(2);
        assert!(table.is_quorum_fresh());
        assert!(!table.is_quorum_complete());
        assert!(table.any_needs_more());
    }

    #[test]
    fn reset_returns_to_pending() {
        let mut table = ReceiverTable::new();
        table.enroll(1);
        table.mark_complete(1);
        table.reset_for_new_generation();
        assert!(!table.is_quorum_fresh());
    }

    #[test]
    fn duplicate_enrollment_is_idempotent() {
        let mut table = ReceiverTable::new();
        table.enroll(1);
        table.mark_complete(1);
        table.enroll(1);
        assert_eq!(table.len(), 1);
        assert!(table.is_quorum_complete());
    }
}
