use super::action::ActionConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Name of the terminal node every flow must declare.
pub const END_NODE: &str = "end";

/// The root flow document: checklist-bearing stages plus the conversational
/// node graph they pair with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfiguration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "stateConfig")]
    pub state_config: StateConfig,
    #[serde(alias = "flowConfig")]
    pub flow_config: FlowConfig,
}

/// Seed data for a session's mutable state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default)]
    pub stages: IndexMap<String, Stage>,
    #[serde(default)]
    pub info: IndexMap<String, Value>,
    #[serde(default, alias = "sessionVariables")]
    pub session_variables: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default, alias = "initialNode", skip_serializing_if = "Option::is_none")]
    pub initial_node: Option<String>,
    pub nodes: IndexMap<String, NodeConfig>,
}

/// One dialogue stage: what the assistant is told, which tools it may call,
/// and what happens around each turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default, alias = "roleMessages")]
    pub role_messages: Vec<Message>,
    #[serde(default, alias = "taskMessages")]
    pub task_messages: Vec<Message>,
    #[serde(default)]
    pub functions: Vec<FunctionSchema>,
    #[serde(default, alias = "preActions")]
    pub pre_actions: Vec<ActionConfig>,
    #[serde(default, alias = "postActions")]
    pub post_actions: Vec<ActionConfig>,
}

impl NodeConfig {
    /// The function whose parameters carry the stage's checklist items.
    pub fn primary_function(&self) -> Option<&FunctionSchema> {
        self.functions.first()
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSchema> {
        self.functions.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// A tool declaration. `properties` and `required` follow JSON-schema; the
/// remaining fields are engine bindings that never reach the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
    #[serde(default)]
    pub required: Vec<String>,
    pub handler: String,
    #[serde(
        default,
        alias = "transitionCallback",
        skip_serializing_if = "Option::is_none"
    )]
    pub transition_callback: Option<String>,
}

impl FunctionSchema {
    /// Renders the schema as a function-calling tool definition.
    pub fn to_tool_definition(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": {
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }
        })
    }
}

/// A checklist-bearing state, paired by name with a node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stage {
    #[serde(default)]
    pub checklist: IndexMap<String, bool>,
    #[serde(default, alias = "checklistIncompleteMessage")]
    pub checklist_incomplete_message: String,
    #[serde(default, alias = "checklistCompleteMessage")]
    pub checklist_complete_message: String,
    #[serde(default, alias = "transitionLogic")]
    pub transition_logic: TransitionLogic,
}

impl Stage {
    /// `true` once every checklist item is set. An empty checklist is complete.
    pub fn is_complete(&self) -> bool {
        self.checklist.values().all(|done| *done)
    }

    /// Items still outstanding, in declaration order.
    pub fn missing_items(&self) -> Vec<&str> {
        self.checklist
            .iter()
            .filter(|(_, done)| !**done)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransitionLogic {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(
        default,
        alias = "defaultTargetNode",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_target_node: Option<String>,
}

impl TransitionLogic {
    /// Every node this logic can lead to, conditions first.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.conditions
            .iter()
            .map(|c| c.target_node.as_str())
            .chain(self.default_target_node.as_deref())
    }
}

/// `info[variable_path] <operator> value` leads to `target_node`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(alias = "variablePath")]
    pub variable_path: String,
    pub operator: String,
    pub value: Value,
    #[serde(alias = "targetNode")]
    pub target_node: String,
}

/// Startup figures reported to the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowDiagnostics {
    pub name: String,
    pub node_count: usize,
    pub stage_count: usize,
    pub schema_count: usize,
    pub initial_node: String,
}

impl FlowConfiguration {
    /// The node a session starts in: `flow_config.initial_node` if set,
    /// otherwise the first declared node other than `"end"`.
    pub fn initial_node(&self) -> Option<&str> {
        match &self.flow_config.initial_node {
            Some(name) => Some(name.as_str()),
            None => self
                .flow_config
                .nodes
                .keys()
                .map(String::as_str)
                .find(|name| *name != END_NODE),
        }
    }

    pub fn node(&self, name: &str) -> Option<&NodeConfig> {
        self.flow_config.nodes.get(name)
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.state_config.stages.get(name)
    }

    /// Every handler identifier a node references, paired with the node name.
    pub fn handler_refs(&self) -> Vec<(&str, &str)> {
        let mut refs = Vec::new();
        for (node_name, node) in &self.flow_config.nodes {
            for function in &node.functions {
                refs.push((node_name.as_str(), function.handler.as_str()));
                if let Some(callback) = &function.transition_callback {
                    refs.push((node_name.as_str(), callback.as_str()));
                }
            }
            for action in node.pre_actions.iter().chain(&node.post_actions) {
                if let Some(handler) = action.handler() {
                    refs.push((node_name.as_str(), handler));
                }
            }
        }
        refs
    }

    pub fn diagnostics(&self) -> FlowDiagnostics {
        FlowDiagnostics {
            name: self.name.clone(),
            node_count: self.flow_config.nodes.len(),
            stage_count: self.state_config.stages.len(),
            schema_count: self
                .flow_config
                .nodes
                .values()
                .map(|node| node.functions.len())
                .sum(),
            initial_node: self.initial_node().unwrap_or_default().to_string(),
        }
    }
}
