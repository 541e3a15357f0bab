use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A pre- or post-turn action attached to a node.
///
/// Known action types get typed payloads; anything else is kept verbatim in
/// [`ActionConfig::Custom`] so newer documents still load and the runtime can
/// decide what to do with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub enum ActionConfig {
    /// Invoke a handler before/after the turn. Every field other than `type`
    /// and `handler` is passed to it as an argument.
    Function {
        handler: String,
        args: Map<String, Value>,
    },
    /// Speak a fixed line.
    TtsSay { text: String },
    /// Close the conversation.
    EndConversation,
    Custom {
        kind: String,
        fields: Map<String, Value>,
    },
}

impl ActionConfig {
    pub fn handler(&self) -> Option<&str> {
        match self {
            ActionConfig::Function { handler, .. } => Some(handler),
            _ => None,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            ActionConfig::Function { .. } => "function",
            ActionConfig::TtsSay { .. } => "tts_say",
            ActionConfig::EndConversation => "end_conversation",
            ActionConfig::Custom { kind, .. } => kind,
        }
    }
}

impl TryFrom<Map<String, Value>> for ActionConfig {
    type Error = String;

    fn try_from(mut fields: Map<String, Value>) -> Result<Self, Self::Error> {
        let kind = match fields.remove("type") {
            Some(Value::String(kind)) => kind,
            Some(other) => return Err(format!("action 'type' must be a string, found {}", other)),
            // A bare `{"handler": ...}` is shorthand for a function action.
            None if fields.contains_key("handler") => "function".to_string(),
            None => return Err("action is missing a 'type' field".to_string()),
        };

        match kind.as_str() {
            "function" => match fields.remove("handler") {
                Some(Value::String(handler)) => Ok(ActionConfig::Function {
                    handler,
                    args: fields,
                }),
                _ => Err("function action requires a string 'handler'".to_string()),
            },
            "tts_say" => match fields.remove("text") {
                Some(Value::String(text)) => Ok(ActionConfig::TtsSay { text }),
                _ => Err("tts_say action requires a string 'text'".to_string()),
            },
            "end_conversation" => Ok(ActionConfig::EndConversation),
            _ => Ok(ActionConfig::Custom { kind, fields }),
        }
    }
}

impl From<ActionConfig> for Map<String, Value> {
    fn from(action: ActionConfig) -> Self {
        let mut map = Map::new();
        map.insert("type".to_string(), Value::String(action.kind().to_string()));
        match action {
            ActionConfig::Function { handler, args } => {
                map.insert("handler".to_string(), Value::String(handler));
                map.extend(args);
            }
            ActionConfig::TtsSay { text } => {
                map.insert("text".to_string(), Value::String(text));
            }
            ActionConfig::EndConversation => {}
            ActionConfig::Custom { fields, .. } => map.extend(fields),
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn function_action_keeps_extra_fields_as_args() {
        let action: ActionConfig = serde_json::from_value(json!({
            "type": "function",
            "handler": "get_variable_action_handler",
            "variable_name": "book"
        }))
        .unwrap();

        match action {
            ActionConfig::Function { handler, args } => {
                assert_eq!(handler, "get_variable_action_handler");
                assert_eq!(args.get("variable_name"), Some(&json!("book")));
                assert!(!args.contains_key("type"));
            }
            other => panic!("Expected function action, got {:?}", other),
        }
    }

    #[test]
    fn unknown_types_are_preserved() {
        let action: ActionConfig = serde_json::from_value(json!({
            "type": "play_sound",
            "file": "ding.wav"
        }))
        .unwrap();
        assert_eq!(action.kind(), "play_sound");

        let back = serde_json::to_value(&action).unwrap();
        assert_eq!(back, json!({"type": "play_sound", "file": "ding.wav"}));
    }

    #[test]
    fn malformed_actions_are_rejected() {
        assert!(serde_json::from_value::<ActionConfig>(json!({"type": "tts_say"})).is_err());
        assert!(serde_json::from_value::<ActionConfig>(json!({"text": "hi"})).is_err());
    }
}
