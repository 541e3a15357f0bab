//! Common test utilities for building flow documents and on-disk fixtures.
use keiro::prelude::*;
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};

/// A three-stage reading tutor.
///
/// intro -> reading -> (score >= 8: end | score >= 5: review | default: review) -> end
#[allow(dead_code)]
pub fn tutoring_flow() -> Value {
    json!({
        "name": "reading_tutor",
        "description": "Guides a learner through one chapter of a book",
        "state_config": {
            "stages": {
                "intro": {
                    "checklist": {"greeted": false},
                    "checklist_incomplete_message": "Missing: {}",
                    "checklist_complete_message": "Welcome aboard!",
                    "transition_logic": {
                        "conditions": [],
                        "default_target_node": "reading"
                    }
                },
                "reading": {
                    "checklist": {"chapter_chosen": false, "summary_given": false},
                    "checklist_incomplete_message": "Still to do: {}",
                    "checklist_complete_message": "Great reading!",
                    "transition_logic": {
                        "conditions": [
                            {"variable_path": "score", "operator": ">=", "value": 8, "target_node": "end"},
                            {"variable_path": "score", "operator": ">=", "value": 5, "target_node": "review"}
                        ],
                        "default_target_node": "review"
                    }
                },
                "review": {
                    "checklist": {"reviewed": false},
                    "checklist_incomplete_message": "Please review: {}",
                    "checklist_complete_message": "All reviewed.",
                    "transition_logic": {"default_target_node": "end"}
                }
            },
            "info": {
                "score": 0,
                "learner_name": "Ada"
            },
            "session_variables": {
                "book": {
                    "title": "Momo",
                    "indexable_by": "chapters",
                    "chapters": ["The Amphitheatre", "Beppo", "Gigi"]
                }
            }
        },
        "flow_config": {
            "initial_node": "intro",
            "nodes": {
                "intro": {
                    "role_messages": [{"role": "system", "content": "You are a patient reading tutor."}],
                    "task_messages": [{"role": "system", "content": "Greet the learner by name."}],
                    "functions": [{
                        "name": "record_greeting",
                        "description": "Record that the learner was greeted",
                        "properties": {
                            "greeted": {"type": "boolean"},
                            "learner_name": {"type": "string"}
                        },
                        "required": ["greeted"],
                        "handler": "general_handler"
                    }],
                    "pre_actions": [
                        {"type": "function", "handler": "get_variable_action_handler", "variable_name": "learner_name"}
                    ]
                },
                "reading": {
                    "task_messages": [{"role": "system", "content": "Read one chapter together."}],
                    "functions": [
                        {
                            "name": "record_reading",
                            "description": "Record reading progress",
                            "properties": {
                                "chapter_chosen": {"type": "boolean"},
                                "summary_given": {"type": "boolean"},
                                "score": {"type": "integer"}
                            },
                            "handler": "general_handler"
                        },
                        {
                            "name": "get_chapter",
                            "description": "Look up the chapter being read",
                            "properties": {
                                "variable_name": {"type": "string"},
                                "current_index": {"type": "integer"}
                            },
                            "required": ["variable_name"],
                            "handler": "get_session_variable_handler"
                        }
                    ],
                    "pre_actions": [{"type": "tts_say", "text": "Let's read!"}],
                    "post_actions": [{"type": "log_event", "event": "reading_done"}]
                },
                "review": {
                    "task_messages": [{"role": "system", "content": "Review the chapter."}],
                    "functions": [{
                        "name": "record_review",
                        "properties": {"reviewed": {"type": "boolean"}},
                        "handler": "general_handler"
                    }]
                },
                "end": {
                    "task_messages": [{"role": "system", "content": "Say goodbye."}],
                    "pre_actions": [{"type": "end_conversation"}]
                }
            }
        }
    })
}

/// The smallest valid flow: one stage with one checklist item, then `end`.
#[allow(dead_code)]
pub fn minimal_flow() -> Value {
    json!({
        "name": "minimal",
        "state_config": {
            "stages": {
                "start": {
                    "checklist": {"done": false},
                    "checklist_incomplete_message": "Missing: {}",
                    "checklist_complete_message": "Done.",
                    "transition_logic": {"default_target_node": "end"}
                }
            }
        },
        "flow_config": {
            "nodes": {
                "start": {
                    "functions": [{
                        "name": "finish",
                        "properties": {"done": {"type": "boolean"}},
                        "handler": "general_handler"
                    }]
                },
                "end": {}
            }
        }
    })
}

/// Serializes `value` into `dir/name`.
#[allow(dead_code)]
pub fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    let content = serde_json::to_string_pretty(value).expect("Failed to serialize fixture");
    fs::write(&path, content).expect("Failed to write fixture");
    path
}

/// Writes a flow document as `dir/flow.json`.
#[allow(dead_code)]
pub fn write_flow(dir: &Path, flow: &Value) -> PathBuf {
    write_json(dir, "flow.json", flow)
}

/// Parses the tutoring flow from memory.
#[allow(dead_code)]
pub fn tutoring_config() -> FlowConfiguration {
    from_json_str(&tutoring_flow().to_string()).expect("Tutoring flow should be valid")
}

/// Turns a `json!` object literal into handler arguments.
#[allow(dead_code)]
pub fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("Arguments must be a JSON object, got {}", other),
    }
}

/// Mutable access to a nested JSON object, for tweaking fixtures.
#[allow(dead_code)]
pub fn at<'a>(value: &'a mut Value, path: &[&str]) -> &'a mut Value {
    path.iter().fold(value, |current, key| {
        current
            .get_mut(*key)
            .unwrap_or_else(|| panic!("Fixture has no key '{}'", key))
    })
}
