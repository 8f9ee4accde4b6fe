//! Built-in corridor environment
//!
//! The agent starts in cell 0 of a one-dimensional corridor and is rewarded
//! by its position. Walking into either wall is forbidden through a negative
//! cost. An episode ends when the last cell is reached.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use qlearn::{AgentConfig, QLearning, State};

#[derive(Args)]
pub struct CorridorArgs {
    /// Number of cells
    #[arg(short, long, default_value = "8")]
    pub length: i64,

    /// Number of episodes to run
    #[arg(short, long, default_value = "20")]
    pub episodes: usize,

    /// Step limit per episode
    #[arg(short, long, default_value = "100")]
    pub max_steps: usize,

    /// Agent name, also the name of the stored table
    #[arg(short, long, default_value = "corridor")]
    pub name: String,

    /// Continue from the stored table if there is one
    #[arg(long)]
    pub resume: bool,

    /// Store the learned table after the run
    #[arg(long)]
    pub save: bool,
}

/// Actions available in the corridor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Left,
    Right,
}

/// Corridor of `length` cells numbered from 0
#[derive(Debug, Clone, Copy)]
pub struct Corridor {
    pub length: i64,
}

impl Corridor {
    pub fn new(length: i64) -> Result<Self> {
        if length < 2 {
            anyhow::bail!("Corridor needs at least 2 cells, got {length}");
        }
        Ok(Self { length })
    }

    pub fn goal(&self) -> i64 {
        self.length - 1
    }

    pub fn position(state: &State) -> i64 {
        state.value().as_i64().unwrap_or(0)
    }

    pub fn cost(&self, position: i64, action: Move) -> f64 {
        match action {
            Move::Left if position == 0 => -1.0,
            Move::Right if position == self.goal() => -1.0,
            _ => 0.0,
        }
    }

    pub fn reward(&self, position: i64) -> f64 {
        position as f64
    }

    pub fn next(&self, position: i64, action: Move) -> i64 {
        let next = match action {
            Move::Left => position - 1,
            Move::Right => position + 1,
        };
        next.clamp(0, self.goal())
    }
}

/// Build an agent bound to the corridor's callbacks
pub fn agent(corridor: Corridor, name: &str, config: &AgentConfig) -> Result<QLearning<Move>> {
    let mut agent = QLearning::from_config(name, vec![Move::Left, Move::Right], config)?;
    agent
        .set_cost(move |state, action| corridor.cost(Corridor::position(state), *action))
        .set_reward(move |state| corridor.reward(Corridor::position(state)))
        .set_state_generator(move |state, action| {
            json!(corridor.next(Corridor::position(state), *action))
        });
    Ok(agent)
}

/// Run one episode, returning the number of steps taken
pub fn run_episode(agent: &mut QLearning<Move>, corridor: Corridor, max_steps: usize) -> Result<usize> {
    agent.start(json!(0))?;

    let mut steps = 0;
    while steps < max_steps {
        agent.perceive_state()?.step()?.perceive_state()?.learn()?;
        steps += 1;

        if agent.state().map(Corridor::position) == Some(corridor.goal()) {
            break;
        }
    }
    Ok(steps)
}

pub async fn run(args: CorridorArgs, config: &AgentConfig, dir: &Path) -> Result<()> {
    let corridor = Corridor::new(args.length)?;
    let mut agent = agent(corridor, &args.name, config)?;

    if args.resume && agent.load(dir).await? {
        info!("Resuming from stored table ({} states)", agent.policy().len());
    }

    println!("Corridor of {} cells, {} episodes\n", corridor.length, args.episodes);
    println!("{:<10} {:>8}", "EPISODE", "STEPS");
    println!("{}", "-".repeat(19));

    for episode in 1..=args.episodes {
        let steps = run_episode(&mut agent, corridor, args.max_steps)
            .with_context(|| format!("Episode {episode} failed"))?;
        println!("{:<10} {:>8}", episode, steps);
    }

    let stats = agent.stats();
    println!(
        "\nSteps: {}  Updates: {}  Known states: {}",
        stats.total_steps, stats.total_updates, stats.known_states
    );

    if args.save {
        let path = agent.save(dir).await?;
        println!("Saved table to {}", path.display());
    }

    Ok(())
}
