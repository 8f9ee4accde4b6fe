//! State and Action types for the agent
//!
//! A [`State`] wraps an arbitrary JSON value and is identified solely by its
//! canonical hash. The value is an owned tree, so cyclic graphs cannot be
//! expressed and hashing always terminates. Object keys are sorted before
//! serialization, so `{"a":1,"b":2}` and `{"b":2,"a":1}` are the same state.
//! Numbers keep their JSON representation: `1` and `1.0` are different states.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Value of a state/action pair
pub type Reward = f64;

/// Anything usable as an action in the agent's action set
pub trait Action: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned {}

impl<T> Action for T where T: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned {}

/// Observed state of the environment
#[derive(Debug, Clone)]
pub struct State {
    value: Value,
    hash: OnceLock<String>,
}

impl State {
    /// Wrap a value. Never fails.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            hash: OnceLock::new(),
        }
    }

    /// Build a state from any serializable value
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(Self::new(serde_json::to_value(value)?))
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Canonical serialization of the value, used as the policy table key
    pub fn hash(&self) -> &str {
        self.hash.get_or_init(|| canonical_json(&self.value))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for State {}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hash())
    }
}

impl From<Value> for State {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Conversion accepted by `set_state`/`start`
pub trait IntoState {
    fn into_state(self) -> Arc<State>;
}

impl IntoState for Arc<State> {
    fn into_state(self) -> Arc<State> {
        self
    }
}

impl IntoState for State {
    fn into_state(self) -> Arc<State> {
        Arc::new(self)
    }
}

impl IntoState for Value {
    fn into_state(self) -> Arc<State> {
        Arc::new(State::new(self))
    }
}

impl IntoState for &str {
    fn into_state(self) -> Arc<State> {
        Arc::new(State::new(self))
    }
}

/// Entry of a policy row: an action and its learned value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionValue<A> {
    pub action: A,
    #[serde(alias = "reward")]
    pub value: Reward,
}

impl<A> ActionValue<A> {
    pub fn new(action: A, value: Reward) -> Self {
        Self { action, value }
    }
}

/// Serialize a JSON value with object keys in sorted order
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::from(key.as_str()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
