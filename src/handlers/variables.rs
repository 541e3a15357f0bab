use super::{Handler, HandlerContext, HandlerResult, arg_str};
use crate::error::HandlerError;
use crate::state::SessionState;
use crate::value::display_value;
use serde_json::{Map, Value, json};
use tracing::debug;

const INDEXABLE_BY: &str = "indexable_by";
const INDEXABLE_BY_ALT: &str = "indexableBy";
const CURRENT_INDEX: &str = "current_index";
const CURRENT_INDEX_ALT: &str = "currentIndex";

/// `get_info_variable_handler`: a pure read of `info[variable_name]`.
pub struct InfoVariableHandler;

impl Handler for InfoVariableHandler {
    fn call(
        &self,
        args: &Map<String, Value>,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerResult, HandlerError> {
        let Some(name) = arg_str(args, "variable_name", "variableName") else {
            return Ok(missing_name());
        };
        Ok(match ctx.state.info.get(name) {
            Some(value) => HandlerResult::success().with_data(value.clone()),
            None => HandlerResult::error(format!("Info variable '{}' not found", name)),
        })
    }
}

/// `get_session_variable_handler`: reads a session variable, walking the
/// cursor of indexable variables.
///
/// An indexable variable looks like
/// `{"indexable_by": "chapters", "chapters": [...], "current_index": 1}`.
/// A `current_index` argument moves the cursor; without one the stored
/// cursor is used. If neither yields a valid index the result asks the
/// caller to get one from the user and retry.
pub struct SessionVariableHandler;

impl Handler for SessionVariableHandler {
    fn call(
        &self,
        args: &Map<String, Value>,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerResult, HandlerError> {
        let Some(name) = arg_str(args, "variable_name", "variableName") else {
            return Ok(missing_name());
        };
        let requested = args.get(CURRENT_INDEX).or_else(|| args.get(CURRENT_INDEX_ALT));
        Ok(resolve_session_variable(ctx.state, name, requested))
    }
}

/// `get_variable_action_handler`: the pre-action form of the variable
/// accessors.
///
/// Looks in `session_variables` first (with the same index semantics as
/// [`SessionVariableHandler`]) and then in `info`. On success the message
/// holds a line ready to be injected into the conversation context.
pub struct VariableActionHandler;

impl Handler for VariableActionHandler {
    fn call(
        &self,
        args: &Map<String, Value>,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerResult, HandlerError> {
        let Some(name) = arg_str(args, "variable_name", "variableName") else {
            return Ok(missing_name());
        };

        let result = if ctx.state.session_variables.contains_key(name) {
            let requested = args.get(CURRENT_INDEX).or_else(|| args.get(CURRENT_INDEX_ALT));
            resolve_session_variable(ctx.state, name, requested)
        } else if let Some(value) = ctx.state.info.get(name) {
            HandlerResult::success().with_data(value.clone())
        } else {
            return Ok(HandlerResult::error(format!("Variable '{}' not found", name)));
        };

        if !result.is_success() {
            return Ok(result);
        }
        let line = match &result.data {
            Some(data) => format!("{}: {}", name, display_value(data)),
            None => name.to_string(),
        };
        Ok(result.with_message(line))
    }
}

fn missing_name() -> HandlerResult {
    HandlerResult::error("Missing required argument 'variable_name'")
}

pub(super) fn resolve_session_variable(
    state: &mut SessionState,
    name: &str,
    requested: Option<&Value>,
) -> HandlerResult {
    let Some(root) = state.session_variables.get_mut(name) else {
        return HandlerResult::error(format!("Session variable '{}' not found", name));
    };

    let field = match root
        .get(INDEXABLE_BY)
        .or_else(|| root.get(INDEXABLE_BY_ALT))
        .and_then(Value::as_str)
    {
        Some(field) => field.to_string(),
        None => return HandlerResult::success().with_data(root.clone()),
    };
    let Some(object) = root.as_object_mut() else {
        return HandlerResult::success().with_data(root.clone());
    };

    let count = object
        .get(&field)
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    if count == 0 {
        return HandlerResult::error(format!(
            "Session variable '{}' has no {} to choose from",
            name, field
        ));
    }

    let index = match requested {
        Some(value) => match valid_index(value, count) {
            Some(index) => {
                object.remove(CURRENT_INDEX_ALT);
                object.insert(CURRENT_INDEX.to_string(), json!(index));
                debug!(variable = %name, index, "Stored current index");
                index
            }
            None => return clarification(name, &field, count),
        },
        None => {
            let stored = object
                .get(CURRENT_INDEX)
                .or_else(|| object.get(CURRENT_INDEX_ALT));
            match stored.and_then(|v| valid_index(v, count)) {
                Some(index) => index,
                None => return clarification(name, &field, count),
            }
        }
    };

    let mut data = Map::new();
    for (key, value) in object.iter() {
        if key == INDEXABLE_BY || key == INDEXABLE_BY_ALT || *key == field {
            continue;
        }
        data.insert(key.clone(), value.clone());
    }
    let current = object[&field][index].clone();
    data.insert(format!("current_{}", field), current);

    HandlerResult::success().with_data(Value::Object(data))
}

/// A non-negative integer below `count`. Whole floats such as `1.0` count.
fn valid_index(value: &Value, count: usize) -> Option<usize> {
    let Value::Number(number) = value else {
        return None;
    };
    let index = match number.as_u64() {
        Some(i) => i,
        None => number
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0 && *f >= 0.0 && *f < count as f64)
            .map(|f| f as u64)?,
    };
    usize::try_from(index).ok().filter(|i| *i < count)
}

fn clarification(name: &str, field: &str, count: usize) -> HandlerResult {
    let max = count - 1;
    HandlerResult::clarification(
        format!(
            "It is not yet known which of the {count} {field} of '{name}' to use. \
             Ask the user, in natural language, which one they mean (a number in the range 0-{max}), \
             then call this function again with current_index set to their answer."
        ),
        json!({
            "variable_name": name,
            "field": field,
            "valid_range": [0, max],
        }),
    )
}
