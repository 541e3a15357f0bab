use super::{Handler, HandlerContext, HandlerResult};
use crate::error::HandlerError;
use crate::evaluator::TransitionEvaluator;
use crate::value::is_truthy;
use itertools::Itertools;
use serde_json::{Map, Value};
use tracing::debug;

/// The built-in `general_handler`, invoked once per turn with the arguments
/// the model extracted.
///
/// 1. Arguments whose key exists in `info` overwrite that entry.
/// 2. Truthy arguments whose key is in the current stage's checklist tick
///    that item. Items are never unticked.
/// 3. A complete checklist yields the stage's complete message and the next
///    node from its transition logic. Otherwise the incomplete message lists
///    the missing items in declaration order.
pub struct ProgressHandler;

impl Handler for ProgressHandler {
    fn call(
        &self,
        args: &Map<String, Value>,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerResult, HandlerError> {
        let stage_name = ctx.stage;
        let state = &mut *ctx.state;

        // State stays untouched when the stage is unknown.
        let stage = state
            .stages
            .get_mut(stage_name)
            .ok_or_else(|| HandlerError::UnknownStage(stage_name.to_string()))?;
        for (key, value) in args {
            if let Some(slot) = state.info.get_mut(key) {
                *slot = value.clone();
            }
            if is_truthy(value) {
                if let Some(done) = stage.checklist.get_mut(key) {
                    *done = true;
                }
            }
        }

        let stage = &state.stages[stage_name];
        let checklist = stage.checklist.clone();

        if !stage.is_complete() {
            let missing = stage.missing_items().into_iter().join(", ");
            debug!(stage = %stage_name, %missing, "Checklist incomplete");
            return Ok(HandlerResult::error(fill_placeholder(
                &stage.checklist_incomplete_message,
                &missing,
            ))
            .with_checklist(checklist));
        }

        let decision =
            TransitionEvaluator::evaluate(stage, state).map_err(|source| HandlerError::Evaluation {
                stage: stage_name.to_string(),
                source,
            })?;
        debug!(
            stage = %stage_name,
            next = %decision.target_node,
            reason = %decision.reason,
            "Checklist complete"
        );

        Ok(HandlerResult::success()
            .with_message(stage.checklist_complete_message.clone())
            .with_checklist(checklist)
            .with_next_node(decision.target_node))
    }
}

/// Substitutes the first `{}` in `template` with `value`.
fn fill_placeholder(template: &str, value: &str) -> String {
    match template.find("{}") {
        Some(pos) => format!("{}{}{}", &template[..pos], value, &template[pos + 2..]),
        None => template.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_filled_once() {
        assert_eq!(fill_placeholder("Missing: {}", "a, b"), "Missing: a, b");
        assert_eq!(fill_placeholder("{} and {}", "x"), "x and {}");
        assert_eq!(fill_placeholder("Keep going", "x"), "Keep going");
    }
}
