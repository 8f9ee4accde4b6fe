//! Policy table: learned action values per state
//!
//! Rows are keyed by [`State::hash`] and hold one entry per action, sorted
//! descending by value with ties in action-set order, so the best known
//! action of a state is always the first entry of its row.

use std::cmp::Ordering;
use std::collections::btree_map;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::state::{Action, ActionValue, Reward, State};

/// Sparse map from state hash to a sorted row of action values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyTable<A> {
    rows: BTreeMap<String, Vec<ActionValue<A>>>,
}

impl<A: Action> PolicyTable<A> {
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }

    /// Number of known states
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.rows.contains_key(hash)
    }

    /// Row of a state, best action first
    pub fn row(&self, hash: &str) -> Option<&[ActionValue<A>]> {
        self.rows.get(hash).map(Vec::as_slice)
    }

    /// Best known action of a state
    pub fn best(&self, hash: &str) -> Option<&ActionValue<A>> {
        self.rows.get(hash).and_then(|row| row.first())
    }

    pub fn rows(&self) -> btree_map::Iter<'_, String, Vec<ActionValue<A>>> {
        self.rows.iter()
    }

    /// Estimate the value of taking `action` in `state`.
    ///
    /// A negative cost is a hard signal and bypasses the table. Otherwise the
    /// stored value is returned when the state has been learned, and the cost
    /// itself serves as the initial estimate when it has not.
    pub fn predict<F>(&self, state: &State, action: &A, cost: F) -> Reward
    where
        F: Fn(&State, &A) -> Reward,
    {
        let cost = cost(state, action);
        if cost < 0.0 {
            return cost;
        }

        match self.rows.get(state.hash()) {
            Some(row) => row
                .iter()
                .find(|entry| entry.action == *action)
                .map_or(cost, |entry| entry.value),
            None => cost,
        }
    }

    /// Overwrite the value of `action` in `state` with `delta` and re-sort
    /// the row. An unseen state gets a full row with zero for every other
    /// action in `actions`.
    pub fn update(&mut self, state: &State, action: &A, delta: Reward, actions: &[A]) {
        let row = self
            .rows
            .entry(state.hash().to_string())
            .or_insert_with(|| {
                actions
                    .iter()
                    .map(|a| ActionValue::new(a.clone(), 0.0))
                    .collect()
            });

        match row.iter_mut().find(|entry| entry.action == *action) {
            Some(entry) => entry.value = delta,
            None => row.push(ActionValue::new(action.clone(), delta)),
        }

        sort_row(row, actions);
    }

    /// True when every row holds exactly one entry per action in `actions`
    pub fn is_complete(&self, actions: &[A]) -> bool {
        self.rows.values().all(|row| {
            row.len() == actions.len()
                && actions
                    .iter()
                    .all(|a| row.iter().filter(|entry| entry.action == *a).count() == 1)
        })
    }
}

impl<A: Action> Default for PolicyTable<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sort descending by value; equal values keep action-set order
pub(crate) fn sort_row<A: PartialEq>(row: &mut [ActionValue<A>], actions: &[A]) {
    let rank = |entry: &ActionValue<A>| {
        actions
            .iter()
            .position(|a| *a == entry.action)
            .unwrap_or(actions.len())
    };
    row.sort_by(|a, b| {
        compare_values(b.value, a.value).then_with(|| rank(a).cmp(&rank(b)))
    });
}

/// Total order on values where 0.0 and -0.0 compare equal and NaN ranks
/// below every number, so a NaN estimate is never the greedy choice
pub(crate) fn compare_values(a: Reward, b: Reward) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => {
            let normalize = |v: Reward| if v == 0.0 { 0.0 } else { v };
            normalize(a).total_cmp(&normalize(b))
        }
    }
}
