//! Messages exchanged with the paired companion process
//!
//! Both directions use the same envelope: a JSON object whose `key` field
//! names the message kind.

use serde::{Deserialize, Serialize};

use crate::settings::EntityName;

/// Value of `api.value` that signals a reachable Home Assistant API
pub const API_OK: &str = "ok";

/// Messages from the companion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key")]
#[serde(rename_all = "snake_case")]
pub enum Inbound {
    Clear,
    Add {
        id: String,
        name: String,
        state: String,
    },
    Change {
        id: String,
        state: String,
    },
    Api {
        value: String,
        #[serde(default)]
        name: String,
    },
    Url {
        value: String,
    },
    Port {
        value: String,
    },
    Token {
        value: String,
    },
    Force {
        value: bool,
    },
    #[serde(other)]
    Unknown,
}

/// Messages to the companion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key")]
#[serde(rename_all = "snake_case")]
pub enum Outbound {
    Url { value: String },
    Port { value: String },
    Token { value: String },
    Force { value: bool },
    Entities { value: Vec<EntityName> },
    Change { entity: String, state: String },
}

impl Outbound {
    pub fn key(&self) -> &'static str {
        match self {
            Outbound::Url { .. } => "url",
            Outbound::Port { .. } => "port",
            Outbound::Token { .. } => "token",
            Outbound::Force { .. } => "force",
            Outbound::Entities { .. } => "entities",
            Outbound::Change { .. } => "change",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inbound_add_deserialize() {
        let json = r#"{"key": "add", "id": "light.bedroom", "name": "Bedroom", "state": "on"}"#;
        let msg: Inbound = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            Inbound::Add {
                id: "light.bedroom".to_string(),
                name: "Bedroom".to_string(),
                state: "on".to_string(),
            }
        );
    }

    #[test]
    fn test_inbound_clear_and_force() {
        let msg: Inbound = serde_json::from_str(r#"{"key": "clear"}"#).unwrap();
        assert_eq!(msg, Inbound::Clear);

        let msg: Inbound = serde_json::from_str(r#"{"key": "force", "value": false}"#).unwrap();
        assert_eq!(msg, Inbound::Force { value: false });
    }

    #[test]
    fn test_inbound_api_without_name() {
        let msg: Inbound =
            serde_json::from_str(r#"{"key": "api", "value": "Connection refused"}"#).unwrap();
        match msg {
            Inbound::Api { value, name } => {
                assert_eq!(value, "Connection refused");
                assert!(name.is_empty());
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_inbound_unknown_key() {
        let msg: Inbound = serde_json::from_str(r#"{"key": "vibrate"}"#).unwrap();
        assert_eq!(msg, Inbound::Unknown);
    }

    #[test]
    fn test_inbound_missing_field_is_error() {
        assert!(serde_json::from_str::<Inbound>(r#"{"key": "change", "id": "x"}"#).is_err());
    }

    #[test]
    fn test_outbound_change_shape() {
        let msg = Outbound::Change {
            entity: "lock.doorlock".to_string(),
            state: "unlock".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"key": "change", "entity": "lock.doorlock", "state": "unlock"})
        );
        assert_eq!(msg.key(), "change");
    }

    #[test]
    fn test_outbound_entities_shape() {
        let msg = Outbound::Entities {
            value: vec![EntityName::new("light.bedroom")],
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"key": "entities", "value": [{"name": "light.bedroom"}]})
        );
    }
}
