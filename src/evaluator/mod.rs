use crate::config::{Operator, Stage};
use crate::error::EvaluationError;
use crate::state::SessionState;
use crate::trace::{ConditionTrace, TraceFormatter};
use tracing::debug;

mod compare;

/// The outcome of evaluating a stage's transition logic.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionDecision {
    /// The node to activate next.
    pub target_node: String,
    /// Index of the condition that fired. `None` when the default was used.
    pub matched_condition: Option<usize>,
    /// A human-readable explanation of the logic that led to the result.
    pub reason: String,
}

/// Decides which node follows a completed stage.
pub struct TransitionEvaluator;

impl TransitionEvaluator {
    /// Evaluates the stage's conditions in declared order against `state.info`.
    ///
    /// The first condition that holds wins and later ones are not looked at.
    /// Without a match the stage's default target is used.
    ///
    /// # Errors
    ///
    /// * `MissingVariable` if a condition names a variable absent from `info`.
    /// * `UnknownOperator` if a condition uses an operator outside the fixed set.
    /// * `TypeMismatch` if the operands cannot be compared with that operator.
    /// * `NoTransition` if nothing matched and there is no default target.
    pub fn evaluate(
        stage: &Stage,
        state: &SessionState,
    ) -> Result<TransitionDecision, EvaluationError> {
        let logic = &stage.transition_logic;
        let mut traces = Vec::with_capacity(logic.conditions.len());

        for (index, condition) in logic.conditions.iter().enumerate() {
            let operator: Operator = condition.operator.parse()?;
            let actual = state
                .info
                .get(&condition.variable_path)
                .ok_or_else(|| EvaluationError::MissingVariable(condition.variable_path.clone()))?;

            let outcome = compare::apply(operator, actual, &condition.value)?;
            traces.push(ConditionTrace {
                variable: condition.variable_path.clone(),
                actual: actual.clone(),
                operator,
                expected: condition.value.clone(),
                outcome,
            });

            if outcome {
                let reason = TraceFormatter::format_decision(&traces, None);
                debug!(target = %condition.target_node, %reason, "Transition condition matched");
                return Ok(TransitionDecision {
                    target_node: condition.target_node.clone(),
                    matched_condition: Some(index),
                    reason,
                });
            }
        }

        let target = logic
            .default_target_node
            .as_ref()
            .ok_or(EvaluationError::NoTransition {
                conditions: logic.conditions.len(),
            })?;
        let reason = TraceFormatter::format_decision(&traces, Some(target));
        debug!(target = %target, %reason, "Falling back to default transition");
        Ok(TransitionDecision {
            target_node: target.clone(),
            matched_condition: None,
            reason,
        })
    }
}
