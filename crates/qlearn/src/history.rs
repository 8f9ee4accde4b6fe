//! Chronological observation log of an agent

use std::collections::vec_deque;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::state::{Reward, State};

/// A single observation. `action` is `None` for a bare perception.
#[derive(Debug, Clone)]
pub struct HistoryEntry<A> {
    pub state: Arc<State>,
    pub action: Option<A>,
    pub reward: Option<Reward>,
}

impl<A> HistoryEntry<A> {
    pub fn new(state: Arc<State>, action: Option<A>, reward: Option<Reward>) -> Self {
        Self {
            state,
            action,
            reward,
        }
    }

    /// True when this entry records a perception rather than a move
    pub fn is_perception(&self) -> bool {
        self.action.is_none()
    }
}

/// Append-only observation log, owned by exactly one agent
#[derive(Debug, Clone)]
pub struct History<A> {
    entries: VecDeque<HistoryEntry<A>>,
    capacity: Option<usize>,
}

impl<A> History<A> {
    /// Create an unbounded history
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: None,
        }
    }

    /// Create a history that keeps only the most recent `capacity` entries.
    /// Storage grows on demand up to the cap.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: Some(capacity),
        }
    }

    /// Append an observation
    pub fn push(&mut self, state: Arc<State>, action: Option<A>, reward: Option<Reward>) {
        if let Some(capacity) = self.capacity {
            while self.entries.len() >= capacity.max(1) {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(HistoryEntry::new(state, action, reward));
    }

    /// All retained entries, oldest first
    pub fn items(&self) -> vec_deque::Iter<'_, HistoryEntry<A>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryEntry<A>> {
        self.entries.back()
    }

    /// The second-to-last and last entries, if there are at least two
    pub fn last_two(&self) -> Option<(&HistoryEntry<A>, &HistoryEntry<A>)> {
        let len = self.entries.len();
        if len < 2 {
            return None;
        }
        Some((&self.entries[len - 2], &self.entries[len - 1]))
    }

    /// Reset to empty at the start of an episode
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<A> Default for History<A> {
    fn default() -> Self {
        Self::new()
    }
}
