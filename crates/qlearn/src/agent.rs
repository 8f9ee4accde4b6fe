//! Q-learning agent - binds the callbacks and drives the learning protocol
//!
//! One iteration of the protocol is
//!
//! ```text
//! start(s0) -> perceive_state() -> step() -> perceive_state() -> learn() -> perceive_state() -> ...
//! ```
//!
//! Callbacks run synchronously inside the agent's methods. They must not call
//! back into the same agent; the borrow checker rejects that for closures
//! that capture the agent, and it is unsupported through any other route.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::error::{Callback, QLearnError, Result};
use crate::history::History;
use crate::persistence;
use crate::policy::{compare_values, PolicyTable};
use crate::state::{Action, ActionValue, IntoState, Reward, State};

type CostFn<A> = Box<dyn Fn(&State, &A) -> Reward + Send + Sync>;
type RewardFn = Box<dyn Fn(&State) -> Reward + Send + Sync>;
type PrinterFn = Box<dyn Fn(&State) + Send + Sync>;
type StateGeneratorFn<A> = Box<dyn Fn(&State, &A) -> Arc<State> + Send + Sync>;

/// Callbacks supplied by the caller
struct Functions<A> {
    cost: Option<CostFn<A>>,
    reward: Option<RewardFn>,
    printer: Option<PrinterFn>,
    state_generator: Option<StateGeneratorFn<A>>,
}

impl<A> Default for Functions<A> {
    fn default() -> Self {
        Self {
            cost: None,
            reward: None,
            printer: None,
            state_generator: None,
        }
    }
}

/// Emit at info level when verbose, debug level otherwise
macro_rules! trace_step {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            info!($($arg)+);
        } else {
            debug!($($arg)+);
        }
    };
}

/// Greedy tabular Q-learning agent
pub struct QLearning<A> {
    name: String,
    actions: Vec<A>,
    alpha: f64,
    state: Option<Arc<State>>,
    policy: PolicyTable<A>,
    history: History<A>,
    functions: Functions<A>,
    verbose: bool,
    rng: StdRng,
    total_steps: u64,
    total_updates: u64,
    last_delta: Option<Reward>,
}

impl<A: Action> QLearning<A> {
    /// Create an agent with the given action set and learning rate. A zero
    /// or NaN `alpha` falls back to the default rate.
    pub fn new(name: impl Into<String>, actions: Vec<A>, alpha: f64) -> Self {
        let config = AgentConfig::default();
        let config = if alpha == 0.0 || alpha.is_nan() {
            config
        } else {
            config.with_alpha(alpha)
        };
        Self::build(name.into(), actions, &config)
    }

    /// Create an agent from a validated configuration
    pub fn from_config(
        name: impl Into<String>,
        actions: Vec<A>,
        config: &AgentConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(name.into(), actions, config))
    }

    fn build(name: String, actions: Vec<A>, config: &AgentConfig) -> Self {
        let history = match config.history_capacity {
            Some(capacity) => History::with_capacity(capacity),
            None => History::new(),
        };
        let rng = config
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        debug!(
            "Agent {} created with {} actions, alpha: {}",
            name,
            actions.len(),
            config.alpha
        );

        Self {
            name,
            actions,
            alpha: config.alpha,
            state: None,
            policy: PolicyTable::new(),
            history,
            functions: Functions::default(),
            verbose: config.verbose,
            rng,
            total_steps: 0,
            total_updates: 0,
            last_delta: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> &[A] {
        &self.actions
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Current state, if one has been set
    pub fn state(&self) -> Option<&State> {
        self.state.as_deref()
    }

    pub fn history(&self) -> &History<A> {
        &self.history
    }

    pub fn policy(&self) -> &PolicyTable<A> {
        &self.policy
    }

    /// Replace the whole table, e.g. with one restored by the caller
    pub fn replace_policy(&mut self, policy: PolicyTable<A>) -> &mut Self {
        self.policy = policy;
        self
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Toggle diagnostic tracing of chosen actions and rankings
    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    /// [required] Cost of performing `action` in `state`. A negative cost
    /// marks the action as forbidden.
    pub fn set_cost<F>(&mut self, func: F) -> &mut Self
    where
        F: Fn(&State, &A) -> Reward + Send + Sync + 'static,
    {
        self.functions.cost = Some(Box::new(func));
        self
    }

    /// [required] Reward of being in a state
    pub fn set_reward<F>(&mut self, func: F) -> &mut Self
    where
        F: Fn(&State) -> Reward + Send + Sync + 'static,
    {
        self.functions.reward = Some(Box::new(func));
        self
    }

    /// [optional] Called with the new state after each step
    pub fn set_printer<F>(&mut self, func: F) -> &mut Self
    where
        F: Fn(&State) + Send + Sync + 'static,
    {
        self.functions.printer = Some(Box::new(func));
        self
    }

    /// [required] Produce the state reached by performing `action` in `state`
    pub fn set_state_generator<F, S>(&mut self, func: F) -> &mut Self
    where
        F: Fn(&State, &A) -> S + Send + Sync + 'static,
        S: IntoState,
    {
        self.functions.state_generator =
            Some(Box::new(move |state: &State, action: &A| func(state, action).into_state()));
        self
    }

    /// Set the current state. Also records a perception in the history.
    pub fn set_state(&mut self, state: impl IntoState) -> &mut Self {
        let state = state.into_state();
        self.history.push(Arc::clone(&state), None, None);
        self.state = Some(state);
        self
    }

    /// Begin an episode. Requires the cost, state generator and reward
    /// functions to be bound.
    pub fn start(&mut self, initial: impl IntoState) -> Result<&mut Self> {
        if self.functions.cost.is_none() {
            return Err(QLearnError::MissingFunction(Callback::Cost));
        }
        if self.functions.state_generator.is_none() {
            return Err(QLearnError::MissingFunction(Callback::StateGenerator));
        }
        if self.functions.reward.is_none() {
            return Err(QLearnError::MissingFunction(Callback::Reward));
        }

        self.history.clear();
        self.set_state(initial);
        info!("Agent {} started", self.name);
        Ok(self)
    }

    /// Record the current state without an action
    pub fn perceive_state(&mut self) -> Result<&mut Self> {
        let state = self.state.clone().ok_or(QLearnError::NoState)?;
        self.history.push(state, None, None);
        Ok(self)
    }

    /// Choose the best action greedily, record it and move to the
    /// generated successor state
    pub fn step(&mut self) -> Result<&mut Self> {
        let state = self.state.clone().ok_or(QLearnError::NoState)?;
        let Some(generate) = self.functions.state_generator.as_ref() else {
            return Err(QLearnError::MissingFunction(Callback::StateGenerator));
        };
        let cost = self
            .functions
            .cost
            .as_ref()
            .ok_or(QLearnError::MissingFunction(Callback::Cost))?;

        let ranking = rank_actions(&self.policy, &self.actions, &state, &**cost, &mut self.rng);
        trace_step!(self.verbose, "{} predicted rewards: {:?}", self.name, ranking);
        let chosen = ranking.into_iter().next().ok_or(QLearnError::NoActions)?;

        trace_step!(
            self.verbose,
            "{} chose action: {:?} (predicted {:.4})",
            self.name,
            chosen.action,
            chosen.value
        );

        self.history
            .push(Arc::clone(&state), Some(chosen.action.clone()), None);
        let next = generate(state.as_ref(), &chosen.action);

        if let Some(printer) = self.functions.printer.as_ref() {
            printer(next.as_ref());
        }

        self.state = Some(next);
        self.total_steps += 1;
        Ok(self)
    }

    /// Learn from the most recent step. Must follow `step()` and a
    /// subsequent `perceive_state()` or `set_state()`.
    pub fn learn(&mut self) -> Result<&mut Self> {
        let (last, current) = self.history.last_two().ok_or(QLearnError::NotMoved {
            entries: self.history.len(),
        })?;
        let action = last.action.clone().ok_or(QLearnError::NotPerceived)?;
        if current.action.is_some() {
            return Err(QLearnError::NotUpdated);
        }
        let reward = self
            .functions
            .reward
            .as_ref()
            .ok_or(QLearnError::MissingFunction(Callback::Reward))?;

        let reward_a = reward(last.state.as_ref());
        let reward_b = reward(current.state.as_ref());
        let delta = self.alpha * (reward_b - reward_a);
        let state = Arc::clone(&last.state);

        self.policy.update(&state, &action, delta, &self.actions);
        self.total_updates += 1;
        self.last_delta = Some(delta);

        trace_step!(
            self.verbose,
            "{} learned {:.4} for {:?} in {}",
            self.name,
            delta,
            action,
            state
        );
        Ok(self)
    }

    /// Predicted value of performing `action` in `state`
    pub fn predict(&self, state: &State, action: &A) -> Result<Reward> {
        let cost = self
            .functions
            .cost
            .as_ref()
            .ok_or(QLearnError::MissingFunction(Callback::Cost))?;
        Ok(self.policy.predict(state, action, &**cost))
    }

    /// Rank the action set by predicted value, best first. A prediction of
    /// exactly zero gets uniform noise in `[0, 1)` so ties do not freeze
    /// exploration.
    pub fn explore(&mut self, state: &State) -> Result<Vec<ActionValue<A>>> {
        let cost = self
            .functions
            .cost
            .as_ref()
            .ok_or(QLearnError::MissingFunction(Callback::Cost))?;

        let ranking = rank_actions(&self.policy, &self.actions, state, &**cost, &mut self.rng);
        trace_step!(self.verbose, "{} predicted rewards: {:?}", self.name, ranking);
        Ok(ranking)
    }

    /// Persist the table as `<dir>/<name>.agent`
    pub async fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        self.save_as(dir, &self.name).await
    }

    /// Persist the table under a different name
    pub async fn save_as(&self, dir: impl AsRef<Path>, name: &str) -> Result<PathBuf> {
        let path = persistence::write_table(dir.as_ref(), name, &self.policy).await?;
        trace_step!(self.verbose, "Agent {} saved to {:?}", self.name, path);
        Ok(path)
    }

    /// Replace the table with the one stored for this agent's name.
    /// Returns `false`, leaving the table untouched, when nothing is stored.
    pub async fn load(&mut self, dir: impl AsRef<Path>) -> Result<bool> {
        let Some(table) = persistence::read_table::<A>(dir.as_ref(), &self.name).await? else {
            return Ok(false);
        };

        if !table.is_complete(&self.actions) {
            warn!(
                "Stored table for {} does not match its action set; keeping it verbatim",
                self.name
            );
        }

        self.policy = table;
        trace_step!(
            self.verbose,
            "Agent {} loaded ({} states)",
            self.name,
            self.policy.len()
        );
        Ok(true)
    }

    /// Get statistics
    pub fn stats(&self) -> AgentStats {
        AgentStats {
            total_steps: self.total_steps,
            total_updates: self.total_updates,
            known_states: self.policy.len(),
            history_len: self.history.len(),
            last_delta: self.last_delta,
        }
    }
}

fn rank_actions<A: Action>(
    policy: &PolicyTable<A>,
    actions: &[A],
    state: &State,
    cost: &dyn Fn(&State, &A) -> Reward,
    rng: &mut StdRng,
) -> Vec<ActionValue<A>> {
    let mut ranking: Vec<ActionValue<A>> = Vec::with_capacity(actions.len());
    for action in actions {
        let mut value = policy.predict(state, action, cost);
        if value == 0.0 {
            value += rng.gen::<f64>();
        }
        ranking.push(ActionValue::new(action.clone(), value));
    }

    // stable: equal predictions keep action-set order
    ranking.sort_by(|a, b| compare_values(b.value, a.value));
    ranking
}

impl<A: fmt::Debug> fmt::Debug for QLearning<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QLearning")
            .field("name", &self.name)
            .field("actions", &self.actions)
            .field("alpha", &self.alpha)
            .field("state", &self.state)
            .field("verbose", &self.verbose)
            .field("total_steps", &self.total_steps)
            .finish_non_exhaustive()
    }
}

/// Agent statistics
#[derive(Debug, Clone, Serialize)]
pub struct AgentStats {
    pub total_steps: u64,
    pub total_updates: u64,
    pub known_states: usize,
    pub history_len: usize,
    pub last_delta: Option<Reward>,
}
