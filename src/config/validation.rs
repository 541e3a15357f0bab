use super::definition::{END_NODE, FlowConfiguration};
use super::operator::Operator;
use crate::error::{ConfigValidationError, FieldCategory};
use crate::registry::HandlerId;
use ahash::AHashMap;
use serde_json::Value;
use tracing::warn;

/// Checks that every checklist item in a raw document is a JSON boolean.
///
/// Runs on the untyped document so a non-boolean item is reported as a
/// validation failure rather than a parse failure.
pub(crate) fn validate_raw_checklists(document: &Value) -> Result<(), ConfigValidationError> {
    let stages = document
        .get("state_config")
        .or_else(|| document.get("stateConfig"))
        .and_then(|state| state.get("stages"))
        .and_then(Value::as_object);

    let Some(stages) = stages else {
        return Ok(());
    };

    for (stage_name, stage) in stages {
        let Some(checklist) = stage.get("checklist").and_then(Value::as_object) else {
            continue;
        };
        for (item, value) in checklist {
            if !value.is_boolean() {
                return Err(ConfigValidationError::ChecklistItemNotBoolean {
                    stage: stage_name.clone(),
                    item: item.clone(),
                    found: value.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Enforces the structural invariants of a flow document.
///
/// Returns the first violation found. Checks run in a fixed order so the
/// same document always reports the same error.
pub fn validate(config: &FlowConfiguration) -> Result<(), ConfigValidationError> {
    let nodes = &config.flow_config.nodes;
    let stages = &config.state_config.stages;

    if !nodes.contains_key(END_NODE) {
        return Err(ConfigValidationError::MissingEndNode);
    }

    match config.initial_node() {
        Some(initial) if !nodes.contains_key(initial) => {
            return Err(ConfigValidationError::UnknownInitialNode(
                initial.to_string(),
            ));
        }
        Some(_) => {}
        None => return Err(ConfigValidationError::NoInitialNode),
    }

    for stage_name in stages.keys() {
        if !nodes.contains_key(stage_name) {
            return Err(ConfigValidationError::StageWithoutNode(stage_name.clone()));
        }
    }
    for node_name in nodes.keys() {
        if node_name != END_NODE && !stages.contains_key(node_name) {
            return Err(ConfigValidationError::NodeWithoutStage(node_name.clone()));
        }
    }

    for (stage_name, stage) in stages {
        if let Some((item, _)) = stage.checklist.iter().find(|(_, done)| **done) {
            return Err(ConfigValidationError::ChecklistItemNotFalse {
                stage: stage_name.clone(),
                item: item.clone(),
            });
        }
    }

    validate_field_names(config)?;

    for (stage_name, stage) in stages {
        for target in stage.transition_logic.targets() {
            if !nodes.contains_key(target) {
                return Err(ConfigValidationError::UnknownTargetNode {
                    stage: stage_name.clone(),
                    target: target.to_string(),
                });
            }
        }
        for condition in &stage.transition_logic.conditions {
            if condition.operator.parse::<Operator>().is_err() {
                return Err(ConfigValidationError::UnknownOperator {
                    stage: stage_name.clone(),
                    operator: condition.operator.clone(),
                });
            }
            if !config.state_config.info.contains_key(&condition.variable_path) {
                warn!(
                    stage = %stage_name,
                    variable = %condition.variable_path,
                    "Transition condition refers to a variable that is not declared in info"
                );
            }
        }
    }

    for (stage_name, stage) in stages {
        // Every stage has a node at this point.
        let primary = nodes
            .get(stage_name)
            .and_then(|node| node.primary_function());
        for item in stage.checklist.keys() {
            let has_param = primary.is_some_and(|f| f.properties.contains_key(item));
            if !has_param {
                return Err(ConfigValidationError::ChecklistParameterMissing {
                    stage: stage_name.clone(),
                    item: item.clone(),
                    function: primary.map(|f| f.name.clone()),
                });
            }
        }
    }

    for (node_name, handler) in config.handler_refs() {
        if handler.parse::<HandlerId>().is_err() {
            return Err(ConfigValidationError::InvalidHandlerId {
                node: node_name.to_string(),
                handler: handler.to_string(),
            });
        }
    }

    Ok(())
}

/// Field names must be disjoint across the checklist union, `info` and
/// `session_variables`. The same checklist item may appear in several stages.
fn validate_field_names(config: &FlowConfiguration) -> Result<(), ConfigValidationError> {
    let mut seen: AHashMap<&str, FieldCategory> = AHashMap::new();

    for stage in config.state_config.stages.values() {
        for item in stage.checklist.keys() {
            seen.insert(item.as_str(), FieldCategory::Checklist);
        }
    }

    let categories = [
        (FieldCategory::Info, &config.state_config.info),
        (
            FieldCategory::SessionVariables,
            &config.state_config.session_variables,
        ),
    ];
    for (category, fields) in categories {
        for field in fields.keys() {
            if let Some(first) = seen.insert(field.as_str(), category) {
                return Err(ConfigValidationError::DuplicateField {
                    field: field.clone(),
                    first,
                    second: category,
                });
            }
        }
    }
    Ok(())
}
