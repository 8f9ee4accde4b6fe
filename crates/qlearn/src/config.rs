//! Agent configuration

use serde::{Deserialize, Serialize};

use crate::error::{QLearnError, Result};

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Learning rate applied to the reward difference of a step
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Promote step diagnostics from debug to info level
    #[serde(default)]
    pub verbose: bool,

    /// Seed for the tie-break noise generator
    #[serde(default)]
    pub seed: Option<u64>,

    /// Keep only the most recent N history entries
    #[serde(default)]
    pub history_capacity: Option<usize>,
}

fn default_alpha() -> f64 {
    0.5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            verbose: false,
            seed: None,
            history_capacity: None,
        }
    }
}

impl AgentConfig {
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check values that the type system cannot rule out
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha <= 0.0 {
            return Err(QLearnError::InvalidConfig(format!(
                "alpha must be positive and finite, got {}",
                self.alpha
            )));
        }
        if let Some(capacity) = self.history_capacity {
            // learning reads the two most recent entries
            if capacity < 2 {
                return Err(QLearnError::InvalidConfig(format!(
                    "history_capacity must be at least 2, got {capacity}"
                )));
            }
        }
        Ok(())
    }
}
