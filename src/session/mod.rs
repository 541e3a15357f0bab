//! Drives one conversation through a loaded flow.
//!
//! A [`FlowSession`] owns its [`SessionState`] exclusively and is driven turn
//! by turn by the conversational runtime: one call completes before the next
//! is issued. The [`FlowConfiguration`] and [`Registry`] behind it are shared
//! read-only and may back any number of sessions.

use crate::config::{self, END_NODE, FlowConfiguration, FlowDiagnostics, Message};
use crate::error::{HandlerResolutionError, LoadError, SessionError};
use crate::handlers::{Handler, HandlerContext, HandlerResult};
use crate::registry::Registry;
use crate::state::SessionState;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

mod node;

pub use node::{ResolvedAction, ResolvedFunction, ResolvedNode};

/// Role given to context lines injected by pre-actions.
pub const CONTEXT_ROLE: &str = "system";

/// What a single action produced when it ran.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionEffect {
    Function {
        handler: String,
        result: HandlerResult,
    },
    Say(String),
    EndConversation,
    Custom {
        kind: String,
        fields: Map<String, Value>,
    },
}

impl ActionEffect {
    /// The line a function action contributes to the conversation context.
    ///
    /// Only successful results contribute; errors and clarifications stay in
    /// the effect list.
    pub fn context_message(&self) -> Option<&str> {
        match self {
            ActionEffect::Function { result, .. } if result.is_success() => {
                result.message.as_deref()
            }
            _ => None,
        }
    }
}

/// Everything the runtime needs after a node becomes active.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEntry {
    pub node: String,
    /// Role messages, then task messages, then injected context.
    pub messages: Vec<Message>,
    pub effects: Vec<ActionEffect>,
    /// Tool definitions of the node's functions.
    pub tools: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: String,
    pub to: String,
    /// Effects of the post-actions of the node that was left.
    pub post_effects: Vec<ActionEffect>,
    pub entry: NodeEntry,
}

/// The outcome of one function call.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub result: HandlerResult,
    pub transition: Option<Transition>,
}

pub struct FlowSession {
    config: Arc<FlowConfiguration>,
    config_path: PathBuf,
    registry: Arc<Registry>,
    nodes: IndexMap<String, ResolvedNode>,
    state: SessionState,
    current: String,
    ended: bool,
}

impl fmt::Debug for FlowSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowSession")
            .field("flow", &self.config.name)
            .field("config_path", &self.config_path)
            .field("current", &self.current)
            .field("ended", &self.ended)
            .finish()
    }
}

impl FlowSession {
    /// Loads, validates and materializes the flow at `config_path`.
    ///
    /// Every handler the flow names is resolved here, so a session never
    /// starts with an unresolvable handler. The session is positioned on the
    /// initial node; call [`begin`](Self::begin) to run its pre-actions.
    pub fn start(
        config_path: impl AsRef<Path>,
        variables_path: Option<&Path>,
        registry: Arc<Registry>,
    ) -> Result<Self, LoadError> {
        let config_path = config_path.as_ref();
        let (config, state) = config::load(config_path, variables_path)?;
        let session = Self::new(Arc::new(config), state, config_path, registry)?;
        Ok(session)
    }

    /// Builds a session from an already validated configuration.
    ///
    /// `config_path` locates the activity manifest for `activity:` handlers.
    pub fn new(
        config: Arc<FlowConfiguration>,
        state: SessionState,
        config_path: impl Into<PathBuf>,
        registry: Arc<Registry>,
    ) -> Result<Self, HandlerResolutionError> {
        let config_path = config_path.into();
        let nodes = node::materialize(&config, &config_path, &registry)?;
        let current = config.initial_node().unwrap_or(END_NODE).to_string();

        info!(
            flow = %config.name,
            nodes = nodes.len(),
            initial = %current,
            "Session ready"
        );
        Ok(Self {
            config,
            config_path,
            registry,
            nodes,
            state,
            current,
            ended: false,
        })
    }

    /// Enters the initial node.
    pub fn begin(&mut self) -> Result<NodeEntry, SessionError> {
        let initial = self.current.clone();
        self.enter_node(&initial)
    }

    /// Dispatches a tool call on the active node.
    ///
    /// Runs the function's handler, then its transition callback if it has
    /// one. The callback may only redirect a successful result. When the
    /// result names a next node, the post-actions of the current node run
    /// and the next node is entered.
    pub fn call_function(
        &mut self,
        name: &str,
        args: &Map<String, Value>,
    ) -> Result<TurnOutcome, SessionError> {
        if self.is_finished() {
            return Err(SessionError::Finished);
        }

        let (handler_id, handler, callback) = {
            let node = self
                .nodes
                .get(&self.current)
                .ok_or_else(|| SessionError::UnknownNode(self.current.clone()))?;
            let function = node
                .function(name)
                .ok_or_else(|| SessionError::UnknownFunction {
                    node: self.current.clone(),
                    function: name.to_string(),
                })?;
            let callback = match (&function.schema.transition_callback, &function.transition_callback) {
                (Some(id), Some(handler)) => Some((id.clone(), handler.clone())),
                _ => None,
            };
            (function.schema.handler.clone(), function.handler.clone(), callback)
        };

        debug!(node = %self.current, function = %name, handler = %handler_id, "Calling function");
        let mut result = self.call_handler(&handler_id, handler.as_ref(), args)?;

        if let Some((callback_id, callback)) = callback {
            let callback_result = self.call_handler(&callback_id, callback.as_ref(), args)?;
            match callback_result.next_node {
                Some(next) if result.is_success() => {
                    debug!(callback = %callback_id, next = %next, "Transition callback chose next node");
                    result.next_node = Some(next);
                }
                Some(next) => {
                    debug!(
                        callback = %callback_id,
                        next = %next,
                        status = ?result.status,
                        "Ignoring transition callback on unsuccessful result"
                    );
                }
                None => {}
            }
        }

        let transition = match result.next_node.clone() {
            Some(next) => Some(self.transition_to(&next)?),
            None => None,
        };
        Ok(TurnOutcome { result, transition })
    }

    /// Resolves `handler_id` and calls it against this session's state.
    ///
    /// This never changes the active node; a `next_node` in the result is
    /// left for the caller to act on.
    pub fn invoke(
        &mut self,
        handler_id: &str,
        args: &Map<String, Value>,
    ) -> Result<HandlerResult, SessionError> {
        if self.is_finished() {
            return Err(SessionError::Finished);
        }
        let handler = self.registry.resolve(handler_id, &self.config_path)?;
        self.call_handler(handler_id, handler.as_ref(), args)
    }

    /// Makes `name` the active node and runs its pre-actions.
    pub fn enter_node(&mut self, name: &str) -> Result<NodeEntry, SessionError> {
        let (mut messages, actions, tools) = {
            let node = self
                .nodes
                .get(name)
                .ok_or_else(|| SessionError::UnknownNode(name.to_string()))?;
            let messages: Vec<Message> = node
                .role_messages
                .iter()
                .chain(&node.task_messages)
                .cloned()
                .collect();
            (messages, node.pre_actions.clone(), node.tool_definitions())
        };

        self.current = name.to_string();
        let effects = self.run_actions(&actions)?;
        messages.extend(
            effects
                .iter()
                .filter_map(ActionEffect::context_message)
                .map(|line| Message::new(CONTEXT_ROLE, line)),
        );

        info!(node = %name, effects = effects.len(), "Entered node");
        Ok(NodeEntry {
            node: name.to_string(),
            messages,
            effects,
            tools,
        })
    }

    /// Runs the post-actions of the active node.
    pub fn run_post_actions(&mut self) -> Result<Vec<ActionEffect>, SessionError> {
        let actions = self
            .nodes
            .get(&self.current)
            .map(|node| node.post_actions.clone())
            .ok_or_else(|| SessionError::UnknownNode(self.current.clone()))?;
        self.run_actions(&actions)
    }

    pub fn current_node(&self) -> &str {
        &self.current
    }

    /// True once the `"end"` node is active, an action ended the
    /// conversation, or a handler failed.
    pub fn is_finished(&self) -> bool {
        self.ended || self.current == END_NODE
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &FlowConfiguration {
        &self.config
    }

    pub fn node(&self, name: &str) -> Option<&ResolvedNode> {
        self.nodes.get(name)
    }

    pub fn diagnostics(&self) -> FlowDiagnostics {
        self.config.diagnostics()
    }

    fn transition_to(&mut self, next: &str) -> Result<Transition, SessionError> {
        if !self.nodes.contains_key(next) {
            return Err(SessionError::UnknownNode(next.to_string()));
        }
        let from = self.current.clone();
        let post_effects = self.run_post_actions()?;
        let entry = self.enter_node(next)?;
        info!(from = %from, to = %next, "Transitioned");
        Ok(Transition {
            from,
            to: next.to_string(),
            post_effects,
            entry,
        })
    }

    fn run_actions(&mut self, actions: &[ResolvedAction]) -> Result<Vec<ActionEffect>, SessionError> {
        let mut effects = Vec::with_capacity(actions.len());
        for action in actions {
            let effect = match action {
                ResolvedAction::Function {
                    handler_id,
                    handler,
                    args,
                } => {
                    let result = self.call_handler(handler_id, handler.as_ref(), args)?;
                    if !result.is_success() {
                        warn!(
                            node = %self.current,
                            handler = %handler_id,
                            status = ?result.status,
                            message = result.message.as_deref().unwrap_or(""),
                            "Action did not resolve"
                        );
                    }
                    ActionEffect::Function {
                        handler: handler_id.clone(),
                        result,
                    }
                }
                ResolvedAction::TtsSay(text) => ActionEffect::Say(text.clone()),
                ResolvedAction::EndConversation => {
                    self.ended = true;
                    ActionEffect::EndConversation
                }
                ResolvedAction::Custom { kind, fields } => ActionEffect::Custom {
                    kind: kind.clone(),
                    fields: fields.clone(),
                },
            };
            effects.push(effect);
        }
        Ok(effects)
    }

    /// A failing handler ends the session; guessing past it would corrupt
    /// the conversation.
    fn call_handler(
        &mut self,
        handler_id: &str,
        handler: &dyn Handler,
        args: &Map<String, Value>,
    ) -> Result<HandlerResult, SessionError> {
        let outcome = {
            let mut ctx = HandlerContext {
                state: &mut self.state,
                stage: &self.current,
            };
            handler.call(args, &mut ctx)
        };
        outcome.map_err(|source| {
            warn!(handler = %handler_id, error = %source, "Handler failed, ending session");
            self.ended = true;
            SessionError::Handler {
                handler: handler_id.to_string(),
                source,
            }
        })
    }
}
