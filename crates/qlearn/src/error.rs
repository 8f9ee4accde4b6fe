//! Error types for the Q-learning agent

use std::fmt;

use thiserror::Error;

/// Callback slots an agent can be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Cost,
    Reward,
    StateGenerator,
    Printer,
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Callback::Cost => "cost",
            Callback::Reward => "reward",
            Callback::StateGenerator => "state generator",
            Callback::Printer => "printer",
        };
        f.write_str(name)
    }
}

/// Main error type for the agent
#[derive(Error, Debug)]
pub enum QLearnError {
    #[error("The {0} function must be defined before it is used")]
    MissingFunction(Callback),

    #[error("Agent must have a state assigned - use `set_state()`")]
    NoState,

    #[error("Agent has not moved - cannot learn yet ({entries} history entries)")]
    NotMoved { entries: usize },

    #[error("Agent should perceive the current state after its last move")]
    NotPerceived,

    #[error("Agent should update the current state after moving")]
    NotUpdated,

    #[error("Agent has no actions to choose from")]
    NoActions,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, QLearnError>;
