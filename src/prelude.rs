//! Prelude module for convenient imports
//!
//! Re-exports the types most callers need to load a flow and drive a session.
//!
//! # Example
//!
//! ```rust,no_run
//! use keiro::prelude::*;
//! use std::sync::Arc;
//!
//! # fn run_example() -> Result<()> {
//! let (config, _state) = load("flows/intro/flow.json", None)?;
//! println!("{:?}", config.diagnostics());
//!
//! let session = FlowSession::start("flows/intro/flow.json", None, Arc::new(Registry::new()))?;
//! println!("Starting at '{}'", session.current_node());
//! # Ok(())
//! # }
//! ```

// Configuration
pub use crate::config::{
    ActionConfig, Condition, FlowConfiguration, FlowDiagnostics, FunctionSchema, Message,
    NodeConfig, Operator, Stage, TransitionLogic, END_NODE, from_json_str, load,
};

// Session driving
pub use crate::session::{ActionEffect, FlowSession, NodeEntry, Transition, TurnOutcome};
pub use crate::state::SessionState;

// Handlers and their resolution
pub use crate::handlers::{Handler, HandlerContext, HandlerResult, Status, handler_fn};
pub use crate::registry::{ActivityModule, ActivityPlugin, HandlerId, Registry};

// Transition evaluation
pub use crate::evaluator::{TransitionDecision, TransitionEvaluator};

// Error types
pub use crate::error::{
    ConfigValidationError, EvaluationError, HandlerError, HandlerResolutionError, LoadError,
    SessionError,
};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
