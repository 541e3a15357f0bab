use crate::config::{ActionConfig, FlowConfiguration, FunctionSchema, Message, NodeConfig};
use crate::error::HandlerResolutionError;
use crate::handlers::Handler;
use crate::registry::Registry;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A function declaration with its handlers already resolved.
pub struct ResolvedFunction {
    pub schema: FunctionSchema,
    pub handler: Arc<dyn Handler>,
    pub transition_callback: Option<Arc<dyn Handler>>,
}

impl fmt::Debug for ResolvedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedFunction")
            .field("name", &self.schema.name)
            .field("handler", &self.schema.handler)
            .field("transition_callback", &self.schema.transition_callback)
            .finish()
    }
}

/// An action with its handler (if any) already resolved.
#[derive(Clone)]
pub enum ResolvedAction {
    Function {
        handler_id: String,
        handler: Arc<dyn Handler>,
        args: Map<String, Value>,
    },
    TtsSay(String),
    EndConversation,
    Custom {
        kind: String,
        fields: Map<String, Value>,
    },
}

impl fmt::Debug for ResolvedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedAction::Function { handler_id, args, .. } => f
                .debug_struct("Function")
                .field("handler_id", handler_id)
                .field("args", args)
                .finish(),
            ResolvedAction::TtsSay(text) => f.debug_tuple("TtsSay").field(text).finish(),
            ResolvedAction::EndConversation => f.write_str("EndConversation"),
            ResolvedAction::Custom { kind, fields } => f
                .debug_struct("Custom")
                .field("kind", kind)
                .field("fields", fields)
                .finish(),
        }
    }
}

/// A node ready to run: every handler it names has been resolved.
#[derive(Debug)]
pub struct ResolvedNode {
    pub name: String,
    pub role_messages: Vec<Message>,
    pub task_messages: Vec<Message>,
    pub functions: Vec<ResolvedFunction>,
    pub pre_actions: Vec<ResolvedAction>,
    pub post_actions: Vec<ResolvedAction>,
}

impl ResolvedNode {
    pub fn function(&self, name: &str) -> Option<&ResolvedFunction> {
        self.functions.iter().find(|f| f.schema.name == name)
    }

    /// Tool definitions for every function of the node.
    pub fn tool_definitions(&self) -> Vec<Value> {
        self.functions
            .iter()
            .map(|f| f.schema.to_tool_definition())
            .collect()
    }
}

/// Resolves every handler of every node up front, so an unresolvable handler
/// fails session startup instead of surfacing mid-conversation.
pub(crate) fn materialize(
    config: &FlowConfiguration,
    config_path: &Path,
    registry: &Registry,
) -> Result<IndexMap<String, ResolvedNode>, HandlerResolutionError> {
    config
        .flow_config
        .nodes
        .iter()
        .map(|(name, node)| {
            materialize_node(name, node, config_path, registry).map(|n| (name.clone(), n))
        })
        .collect()
}

fn materialize_node(
    name: &str,
    node: &NodeConfig,
    config_path: &Path,
    registry: &Registry,
) -> Result<ResolvedNode, HandlerResolutionError> {
    let functions = node
        .functions
        .iter()
        .map(|schema| {
            let handler = registry.resolve(&schema.handler, config_path)?;
            let transition_callback = schema
                .transition_callback
                .as_deref()
                .map(|id| registry.resolve(id, config_path))
                .transpose()?;
            Ok(ResolvedFunction {
                schema: schema.clone(),
                handler,
                transition_callback,
            })
        })
        .collect::<Result<Vec<_>, HandlerResolutionError>>()?;

    Ok(ResolvedNode {
        name: name.to_string(),
        role_messages: node.role_messages.clone(),
        task_messages: node.task_messages.clone(),
        functions,
        pre_actions: resolve_actions(&node.pre_actions, config_path, registry)?,
        post_actions: resolve_actions(&node.post_actions, config_path, registry)?,
    })
}

fn resolve_actions(
    actions: &[ActionConfig],
    config_path: &Path,
    registry: &Registry,
) -> Result<Vec<ResolvedAction>, HandlerResolutionError> {
    actions
        .iter()
        .map(|action| {
            Ok(match action {
                ActionConfig::Function { handler, args } => ResolvedAction::Function {
                    handler_id: handler.clone(),
                    handler: registry.resolve(handler, config_path)?,
                    args: args.clone(),
                },
                ActionConfig::TtsSay { text } => ResolvedAction::TtsSay(text.clone()),
                ActionConfig::EndConversation => ResolvedAction::EndConversation,
                ActionConfig::Custom { kind, fields } => ResolvedAction::Custom {
                    kind: kind.clone(),
                    fields: fields.clone(),
                },
            })
        })
        .collect()
}
