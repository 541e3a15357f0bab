use super::ConditionTrace;
use crate::value::display_value;
use itertools::Itertools;

/// Formats condition traces into human-readable explanations.
pub struct TraceFormatter;

impl TraceFormatter {
    /// Formats a single condition, e.g. `$score (was 7) >= 5`.
    pub fn format_condition(trace: &ConditionTrace) -> String {
        format!(
            "${} (was {}) {} {}",
            trace.variable,
            display_value(&trace.actual),
            trace.operator,
            display_value(&trace.expected)
        )
    }

    /// Explains a transition decision.
    ///
    /// Only the decisive condition is shown when one matched; otherwise every
    /// rejected condition is listed before the fallback.
    pub fn format_decision(traces: &[ConditionTrace], default_target: Option<&str>) -> String {
        if let Some(matched) = traces.iter().find(|t| t.outcome) {
            return Self::format_condition(matched);
        }

        let rejected = traces
            .iter()
            .map(|t| format!("NOT {}", Self::format_condition(t)))
            .join(", ");
        match (rejected.is_empty(), default_target) {
            (true, Some(target)) => format!("default -> {}", target),
            (true, None) => "no conditions".to_string(),
            (false, Some(target)) => format!("{}; default -> {}", rejected, target),
            (false, None) => rejected,
        }
    }
}
