//! Handlers: named units of behavior invoked with structured arguments and
//! the session's shared state.

use crate::error::HandlerError;
use crate::state::SessionState;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

mod progress;
mod variables;

pub use progress::ProgressHandler;
pub use variables::{InfoVariableHandler, SessionVariableHandler, VariableActionHandler};

/// What a handler gets to see besides its arguments.
pub struct HandlerContext<'a> {
    pub state: &'a mut SessionState,
    /// Name of the active node, which is also the name of its stage.
    pub stage: &'a str,
}

/// Defines the contract for any behavior a flow document can name.
pub trait Handler: Send + Sync {
    fn call(
        &self,
        args: &Map<String, Value>,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerResult, HandlerError>;
}

/// Adapts a closure into a [`Handler`].
pub struct FnHandler<F>(F);

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&Map<String, Value>, &mut HandlerContext<'_>) -> Result<HandlerResult, HandlerError>
        + Send
        + Sync,
{
    FnHandler(f)
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&Map<String, Value>, &mut HandlerContext<'_>) -> Result<HandlerResult, HandlerError>
        + Send
        + Sync,
{
    fn call(
        &self,
        args: &Map<String, Value>,
        ctx: &mut HandlerContext<'_>,
    ) -> Result<HandlerResult, HandlerError> {
        (self.0)(args, ctx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Error,
    /// Not an error: the caller should ask the user for something and retry.
    Clarification,
}

/// The result relayed back to the tool-calling layer.
///
/// `next_node` is never serialized; it tells the runtime which node to
/// activate next.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResult {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checklist: Option<IndexMap<String, bool>>,
    #[serde(skip)]
    pub next_node: Option<String>,
}

impl HandlerResult {
    fn with_status(status: Status) -> Self {
        Self {
            status,
            message: None,
            data: None,
            checklist: None,
            next_node: None,
        }
    }

    pub fn success() -> Self {
        Self::with_status(Status::Success)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_status(Status::Error).with_message(message)
    }

    pub fn clarification(message: impl Into<String>, data: Value) -> Self {
        Self::with_status(Status::Clarification)
            .with_message(message)
            .with_data(data)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_checklist(mut self, checklist: IndexMap<String, bool>) -> Self {
        self.checklist = Some(checklist);
        self
    }

    pub fn with_next_node(mut self, node: impl Into<String>) -> Self {
        self.next_node = Some(node.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn is_clarification(&self) -> bool {
        self.status == Status::Clarification
    }

    /// The JSON payload handed back to the model.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Reads a string argument, accepting a camelCase spelling as well.
pub(crate) fn arg_str<'a>(args: &'a Map<String, Value>, snake: &str, camel: &str) -> Option<&'a str> {
    args.get(snake)
        .or_else(|| args.get(camel))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn next_node_is_not_serialized() {
        let result = HandlerResult::success()
            .with_message("done")
            .with_next_node("quiz");
        assert_eq!(result.to_json(), json!({"status": "success", "message": "done"}));
        assert_eq!(result.next_node.as_deref(), Some("quiz"));
    }

    #[test]
    fn closures_can_act_as_handlers() {
        let handler = handler_fn(|args, ctx| {
            ctx.state.info.insert("seen".to_string(), json!(args.len()));
            Ok(HandlerResult::success())
        });
        let mut state = SessionState::default();
        let mut ctx = HandlerContext {
            state: &mut state,
            stage: "intro",
        };
        let mut args = Map::new();
        args.insert("a".to_string(), json!(1));

        let result = handler.call(&args, &mut ctx).unwrap();
        assert!(result.is_success());
        assert_eq!(state.info["seen"], json!(1));
    }
}
