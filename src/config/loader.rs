use super::definition::FlowConfiguration;
use super::validation::{validate, validate_raw_checklists};
use crate::error::{ConfigValidationError, LoadError};
use crate::state::SessionState;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Loads a flow document, merges an optional variables file into its
/// `session_variables`, validates the result and seeds a fresh session state.
///
/// The variables file is either a plain object of variables or an object
/// wrapping them under `session_variables`. Its entries override the ones
/// declared in the document. Merging happens before validation, so name
/// collisions introduced by the file are reported like any other.
pub fn load<P: AsRef<Path>>(
    path: P,
    variables_path: Option<&Path>,
) -> Result<(FlowConfiguration, SessionState), LoadError> {
    let path = path.as_ref();
    let document = read_json(path)?;

    let variables = match variables_path {
        Some(var_path) => {
            let raw = read_json(var_path)?;
            Some(extract_variables(raw).map_err(|reason| {
                ConfigValidationError::InvalidVariablesFile {
                    path: var_path.to_path_buf(),
                    reason,
                }
            })?)
        }
        None => None,
    };

    let config = parse_document(document, variables, &path.display().to_string())?;
    let state = SessionState::from_config(&config);

    let diagnostics = config.diagnostics();
    info!(
        flow = %diagnostics.name,
        nodes = diagnostics.node_count,
        schemas = diagnostics.schema_count,
        initial = %diagnostics.initial_node,
        "Loaded flow configuration"
    );
    Ok((config, state))
}

/// Parses and validates an in-memory flow document.
pub fn from_json_str(json: &str) -> Result<FlowConfiguration, LoadError> {
    let document: Value = serde_json::from_str(json).map_err(|e| LoadError::Parse {
        source_name: "<memory>".to_string(),
        message: e.to_string(),
    })?;
    parse_document(document, None, "<memory>")
}

pub(crate) fn parse_document(
    mut document: Value,
    variables: Option<Map<String, Value>>,
    source_name: &str,
) -> Result<FlowConfiguration, LoadError> {
    if let Some(variables) = variables {
        debug!(count = variables.len(), "Merging session variables");
        merge_variables(&mut document, variables).map_err(|message| LoadError::Parse {
            source_name: source_name.to_string(),
            message,
        })?;
    }

    validate_raw_checklists(&document)?;

    let config: FlowConfiguration =
        serde_json::from_value(document).map_err(|e| LoadError::Parse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;

    validate(&config)?;
    Ok(config)
}

fn read_json(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| LoadError::Parse {
        source_name: path.display().to_string(),
        message: e.to_string(),
    })
}

fn extract_variables(raw: Value) -> Result<Map<String, Value>, String> {
    let Value::Object(mut map) = raw else {
        return Err("expected a JSON object".to_string());
    };
    if map.len() == 1 {
        let wrapped = map
            .remove("session_variables")
            .or_else(|| map.remove("sessionVariables"));
        match wrapped {
            Some(Value::Object(inner)) => return Ok(inner),
            Some(_) => return Err("'session_variables' must be an object".to_string()),
            None => {}
        }
    }
    Ok(map)
}

fn merge_variables(document: &mut Value, variables: Map<String, Value>) -> Result<(), String> {
    let root = document
        .as_object_mut()
        .ok_or_else(|| "flow document must be a JSON object".to_string())?;

    let state_key = if root.contains_key("stateConfig") && !root.contains_key("state_config") {
        "stateConfig"
    } else {
        "state_config"
    };
    let state = root
        .entry(state_key)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| format!("'{}' must be an object", state_key))?;

    let vars_key = if state.contains_key("sessionVariables") {
        "sessionVariables"
    } else {
        "session_variables"
    };
    let target = state
        .entry(vars_key)
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| format!("'{}' must be an object", vars_key))?;

    target.extend(variables);
    Ok(())
}
