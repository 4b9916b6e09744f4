//! Display labels for entity states and panel status

use std::collections::HashMap;

/// Key shown in the status line until the companion reports the API
pub const UNAVAILABLE: &str = "unavailable";

const EN_LABELS: [(&str, &str); 13] = [
    ("on", "On"),
    ("off", "Off"),
    ("open", "Open"),
    ("opening", "Opening"),
    ("closing", "Closing"),
    ("closed", "Closed"),
    ("unlocked", "Unlocked"),
    ("locked", "Locked"),
    ("locking", "Locking"),
    ("unlock", "Unlocking"),
    ("unknown", "Unknown"),
    ("unavailable", "Unavailable"),
    ("playing", "Playing"),
];

/// String catalog with built-in English labels
#[derive(Debug, Clone)]
pub struct Catalog {
    labels: HashMap<String, String>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            labels: EN_LABELS
                .iter()
                .map(|(key, label)| (key.to_string(), label.to_string()))
                .collect(),
        }
    }
}

impl Catalog {
    /// Built-in labels with `overrides` layered on top
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut catalog = Self::default();
        catalog.labels.extend(
            overrides
                .iter()
                .map(|(key, label)| (key.clone(), label.clone())),
        );
        catalog
    }

    /// Label for `key`; unknown keys are shown verbatim
    pub fn gettext(&self, key: &str) -> String {
        self.labels
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
