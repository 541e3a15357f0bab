mod formatter;

pub use formatter::TraceFormatter;

use crate::config::Operator;
use serde_json::Value;

/// A record of how one transition condition was evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionTrace {
    pub variable: String,
    pub actual: Value,
    pub operator: Operator,
    pub expected: Value,
    pub outcome: bool,
}
