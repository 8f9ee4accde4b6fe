//! QLearn - greedy tabular Q-learning agent
//!
//! The caller supplies a cost, reward and state transition function; the
//! agent greedily picks actions, learns a per-state action-value table from
//! the reward difference of each step, and persists that table.
//!
//! Each agent owns its history and table outright, so several agents can be
//! driven side by side in one process without sharing any state.

// Clippy pedantic allows - these are intentional design choices
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::float_cmp)]

pub mod agent;
pub mod config;
pub mod error;
pub mod history;
pub mod persistence;
pub mod policy;
pub mod state;

pub use agent::{AgentStats, QLearning};
pub use config::AgentConfig;
pub use error::{Callback, QLearnError, Result};
pub use history::{History, HistoryEntry};
pub use policy::PolicyTable;
pub use state::{Action, ActionValue, IntoState, Reward, State};
