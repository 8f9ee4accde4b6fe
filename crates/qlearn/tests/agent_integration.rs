//! Integration tests for the Q-learning agent
//!
//! These tests drive full perceive/step/learn cycles through the public API.

#![allow(clippy::float_cmp)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use qlearn::{AgentConfig, PolicyTable, QLearnError, QLearning, State};
use serde_json::{json, Value};

const EPSILON: f64 = 1e-12;

/// Two-state world: every action leads from "A" to "B"
fn two_state_agent(name: &str, seed: u64) -> QLearning<u32> {
    let mut agent = QLearning::from_config(
        name,
        vec![0, 1],
        &AgentConfig::default().with_alpha(0.3).with_seed(seed),
    )
    .unwrap();
    agent
        .set_cost(|_, _| 1.0)
        .set_reward(|state| if state.value() == &json!("B") { 10.0 } else { 0.0 })
        .set_state_generator(|state, _| {
            if state.value() == &json!("A") {
                json!("B")
            } else {
                state.value().clone()
            }
        });
    agent
}

fn run_cycle(agent: &mut QLearning<u32>) {
    agent
        .perceive_state()
        .unwrap()
        .step()
        .unwrap()
        .perceive_state()
        .unwrap()
        .learn()
        .unwrap();
}

/// Corridor of `length` cells; action 0 walks left, 1 walks right.
/// Walking into a wall is forbidden.
fn corridor_agent(name: &str, length: i64) -> QLearning<u32> {
    let mut agent = QLearning::from_config(
        name,
        vec![0, 1],
        &AgentConfig::default().with_alpha(0.5).with_seed(5),
    )
    .unwrap();
    agent
        .set_cost(move |state, action| {
            let pos = state.value().as_i64().unwrap_or(0);
            match action {
                0 if pos == 0 => -1.0,
                1 if pos == length - 1 => -1.0,
                _ => 0.0,
            }
        })
        .set_reward(|state| state.value().as_f64().unwrap_or(0.0))
        .set_state_generator(move |state, action| {
            let pos = state.value().as_i64().unwrap_or(0);
            let next = if *action == 0 { pos - 1 } else { pos + 1 };
            json!(next.clamp(0, length - 1))
        });
    agent
}

#[test]
fn test_two_state_scenario() {
    let mut agent = two_state_agent("test", 1);
    agent.start("A").unwrap();

    let hash_a = State::new(json!("A")).hash().to_string();

    // before learning, both actions are estimated by their cost
    assert_eq!(agent.predict(&State::new(json!("A")), &0).unwrap(), 1.0);
    assert_eq!(agent.predict(&State::new(json!("A")), &1).unwrap(), 1.0);

    run_cycle(&mut agent);

    let chosen = agent
        .history()
        .items()
        .find_map(|entry| entry.action)
        .unwrap();
    let other = 1 - chosen;

    assert_eq!(agent.state().unwrap().value(), &json!("B"));

    let row = agent.policy().row(&hash_a).unwrap();
    assert_eq!(row.len(), 2);
    assert_eq!(row[0].action, chosen);
    assert!((row[0].value - 3.0).abs() < EPSILON);
    assert_eq!(row[1].action, other);
    assert_eq!(row[1].value, 0.0);

    // the learned values are now what predict reports for "A"
    let state_a = State::new(json!("A"));
    assert!((agent.predict(&state_a, &chosen).unwrap() - 3.0).abs() < EPSILON);
    assert_eq!(agent.predict(&state_a, &other).unwrap(), 0.0);
}

#[test]
fn test_zero_predictions_get_noise() {
    let mut agent = two_state_agent("noisy", 9);
    agent.set_cost(|_, _| 0.0);
    agent.start("A").unwrap();

    let ranking = agent.explore(&State::new(json!("A"))).unwrap();
    assert_eq!(ranking.len(), 2);
    for entry in &ranking {
        assert!(entry.value >= 0.0 && entry.value < 1.0);
    }
    assert!(ranking[0].value >= ranking[1].value);

    run_cycle(&mut agent);
    let row = agent.policy().row(State::new(json!("A")).hash()).unwrap();
    assert!((row[0].value - 3.0).abs() < EPSILON);
}

#[test]
fn test_negative_cost_bypasses_learned_value() {
    let mut agent = two_state_agent("forbidden", 2);
    agent.start("A").unwrap();
    run_cycle(&mut agent);

    let state_a = State::new(json!("A"));
    let best = agent.policy().best(state_a.hash()).unwrap().action;

    agent.set_cost(move |_, action| if *action == best { -4.0 } else { 1.0 });
    assert_eq!(agent.predict(&state_a, &best).unwrap(), -4.0);

    // the forbidden action now ranks last
    let ranking = agent.explore(&state_a).unwrap();
    assert_eq!(ranking.last().unwrap().action, best);
}

#[test]
fn test_protocol_violations_do_not_touch_table() {
    let mut agent = two_state_agent("strict", 3);

    assert!(matches!(agent.learn(), Err(QLearnError::NotMoved { .. })));

    agent.start("A").unwrap();
    assert!(matches!(agent.learn(), Err(QLearnError::NotMoved { .. })));

    agent.perceive_state().unwrap();
    assert!(matches!(agent.learn(), Err(QLearnError::NotPerceived)));

    agent.step().unwrap();
    assert!(matches!(agent.learn(), Err(QLearnError::NotPerceived)));

    agent.step().unwrap();
    assert!(matches!(agent.learn(), Err(QLearnError::NotUpdated)));

    assert!(agent.policy().is_empty());

    // recovering the sequence makes learning possible again
    agent.perceive_state().unwrap().learn().unwrap();
    assert_eq!(agent.policy().len(), 1);
}

#[test]
fn test_set_state_counts_as_perception() {
    let mut agent = two_state_agent("manual", 4);
    agent.start("A").unwrap();
    agent.step().unwrap();
    agent.set_state("B");
    agent.learn().unwrap();

    assert_eq!(agent.policy().len(), 1);
}

#[test]
fn test_overwrite_semantics() {
    let mut agent = two_state_agent("overwrite", 6);
    agent.set_reward(|state| match state.value() {
        Value::String(s) if s == "B" => 10.0,
        Value::String(s) if s == "C" => 1.0,
        _ => 0.0,
    });

    // same transition A -> B twice: the value is replaced, not summed
    for _ in 0..2 {
        agent.start("A").unwrap();
        run_cycle(&mut agent);
    }

    let row = agent.policy().row(State::new(json!("A")).hash()).unwrap();
    assert!((row[0].value - 3.0).abs() < EPSILON);
    assert_eq!(agent.stats().total_updates, 2);
}

#[test]
fn test_table_stays_complete_and_sorted() {
    let mut agent = corridor_agent("corridor", 6);

    for _ in 0..10 {
        agent.start(json!(0)).unwrap();
        for _ in 0..20 {
            run_cycle(&mut agent);
        }
    }

    let policy = agent.policy();
    assert!(policy.is_complete(&[0, 1]));
    for (_, row) in policy.rows() {
        assert_eq!(row.len(), 2);
        assert!(row[0].value >= row[1].value);
        if row[0].value == row[1].value {
            assert_eq!(row[0].action, 0);
        }
    }
}

#[test]
fn test_corridor_learns_to_walk_right() {
    let mut agent = corridor_agent("walker", 5);

    for _ in 0..30 {
        agent.start(json!(0)).unwrap();
        for _ in 0..12 {
            run_cycle(&mut agent);
        }
    }

    // every interior cell prefers moving right
    for pos in 1..4 {
        let best = agent.policy().best(State::new(json!(pos)).hash()).unwrap();
        assert_eq!(best.action, 1, "cell {pos}");
        assert!(best.value > 0.0);
    }
}

#[test]
fn test_agents_do_not_share_history() {
    let mut first = two_state_agent("first", 7);
    let mut second = two_state_agent("second", 8);

    first.start("A").unwrap();
    run_cycle(&mut first);

    assert_eq!(first.history().len(), 4);
    assert!(second.history().is_empty());

    // starting the second agent must not clear the first one's log
    second.start("A").unwrap();
    assert_eq!(first.history().len(), 4);
    assert_eq!(second.history().len(), 1);
    assert!(second.policy().is_empty());
}

#[test]
fn test_printer_runs_once_per_step() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut agent = two_state_agent("printer", 10);
    agent.set_printer(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    agent.start("A").unwrap();
    for _ in 0..3 {
        run_cycle(&mut agent);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(agent.stats().total_steps, 3);
}

#[test]
fn test_bounded_history_still_learns() {
    let config = AgentConfig {
        history_capacity: Some(2),
        ..AgentConfig::default().with_alpha(0.3).with_seed(12)
    };
    let mut agent: QLearning<u32> = QLearning::from_config("bounded", vec![0, 1], &config).unwrap();
    agent
        .set_cost(|_, _| 1.0)
        .set_reward(|state| if state.value() == &json!("B") { 10.0 } else { 0.0 })
        .set_state_generator(|_, _| json!("B"));

    agent.start("A").unwrap();
    run_cycle(&mut agent);

    assert_eq!(agent.history().len(), 2);
    assert_eq!(agent.policy().len(), 1);
}

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();

    let mut trained = corridor_agent("roundtrip", 5);
    for _ in 0..5 {
        trained.start(json!(0)).unwrap();
        for _ in 0..8 {
            run_cycle(&mut trained);
        }
    }
    let path = trained.save(dir.path()).await.unwrap();
    assert_eq!(path, dir.path().join("roundtrip.agent"));

    let mut fresh = corridor_agent("roundtrip", 5);
    assert!(fresh.load(dir.path()).await.unwrap());
    assert_eq!(fresh.policy(), trained.policy());

    let original: Vec<_> = trained.policy().rows().collect();
    let restored: Vec<_> = fresh.policy().rows().collect();
    assert_eq!(original, restored);
}

#[tokio::test]
async fn test_save_as_uses_other_name() {
    let dir = tempfile::tempdir().unwrap();

    let mut agent = two_state_agent("source", 13);
    agent.start("A").unwrap();
    run_cycle(&mut agent);
    agent.save_as(dir.path(), "copy").await.unwrap();

    let mut copy = two_state_agent("copy", 14);
    assert!(copy.load(dir.path()).await.unwrap());
    assert_eq!(copy.policy(), agent.policy());

    let mut source = two_state_agent("source", 15);
    assert!(!source.load(dir.path()).await.unwrap());
    assert!(source.policy().is_empty());
}

#[tokio::test]
async fn test_load_replaces_table_wholesale() {
    let dir = tempfile::tempdir().unwrap();

    let mut stored = PolicyTable::new();
    stored.update(&State::new(json!("Z")), &1u32, 2.0, &[0, 1]);
    qlearn::persistence::write_table(dir.path(), "replace", &stored)
        .await
        .unwrap();

    let mut agent = two_state_agent("replace", 16);
    agent.start("A").unwrap();
    run_cycle(&mut agent);
    assert!(agent.policy().contains(State::new(json!("A")).hash()));

    assert!(agent.load(dir.path()).await.unwrap());
    assert_eq!(agent.policy(), &stored);
    assert!(!agent.policy().contains(State::new(json!("A")).hash()));
}
