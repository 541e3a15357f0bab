//! # Keiro - Flow Configuration & Execution Engine
//!
//! **Keiro** runs checklist-driven dialogue flows for a tutoring agent. A flow
//! document pairs *stages* (boolean checklists, transition logic) with *nodes*
//! (role/task messages, callable functions, pre- and post-actions). The engine
//! loads and validates that document, resolves every handler it names, and
//! then drives one conversation turn by turn: tick off checklist items, read
//! variables, and decide the next node once a stage is complete.
//!
//! ## Core Workflow
//!
//! 1.  **Build a Registry**: `Registry::builder()` holds the built-in handlers
//!     and any `ActivityPlugin` supplying `activity:<name>` handlers. Build it
//!     once and share it between sessions.
//! 2.  **Start a Session**: `FlowSession::start` loads the flow document,
//!     merges an optional variables file, validates every structural rule and
//!     resolves all handlers before anything runs.
//! 3.  **Drive Turns**: relay the model's tool calls to `call_function`. The
//!     result goes back to the model; a transition carries the next node's
//!     messages and tools.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keiro::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! fn main() -> Result<()> {
//!     let registry = Arc::new(Registry::new());
//!     let mut session = FlowSession::start("flows/intro/flow.json", None, registry)?;
//!
//!     let entry = session.begin()?;
//!     println!("Entered '{}' with {} tools", entry.node, entry.tools.len());
//!
//!     let args = json!({"greeted": true});
//!     let args = args.as_object().cloned().unwrap_or_default();
//!     let outcome = session.call_function("record_progress", &args)?;
//!
//!     println!("-> {}", outcome.result.to_json());
//!     if let Some(transition) = outcome.transition {
//!         println!("-> Moved from '{}' to '{}'", transition.from, transition.to);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod evaluator;
pub mod handlers;
pub mod prelude;
pub mod registry;
pub mod session;
pub mod state;
pub mod trace;
pub mod value;
