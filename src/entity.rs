//! Entity model and the tap action table

use std::collections::HashMap;

use serde::Serialize;

/// An entity shown on the panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    /// Home Assistant entity id (e.g., lock.doorlock)
    pub id: String,
    pub name: String,
    pub state: String,
}

impl Entity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: state.into(),
        }
    }
}

/// Current state -> action requested when the entity is tapped
const NEXT_STATES: [(&str, &str); 10] = [
    ("on", "turn_off"),
    ("off", "turn_on"),
    ("open", "close_cover"),
    ("opening", "close_cover"),
    ("closing", "open_cover"),
    ("closed", "open_cover"),
    ("unlocked", "lock"),
    ("locked", "unlock"),
    ("locking", "unlock"),
    // Lets a lock be unlocked again before the new state is reported
    ("unlock", "unlock"),
];

/// Maps an entity's current state to the action a tap requests
#[derive(Debug, Clone)]
pub struct NextStateTable {
    actions: HashMap<&'static str, &'static str>,
}

impl Default for NextStateTable {
    fn default() -> Self {
        Self {
            actions: NEXT_STATES.into_iter().collect(),
        }
    }
}

impl NextStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Action to request for `state`, or `None` when the state has no mapping
    pub fn next_action(&self, state: &str) -> Option<&'static str> {
        self.actions.get(state).copied()
    }
}
