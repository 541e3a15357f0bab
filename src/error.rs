use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort session startup: reading, parsing, validating and
/// materializing a flow document.
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    #[error("File '{}' does not exist", .path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read '{}': {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("Failed to parse '{source_name}': {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("Invalid flow configuration: {0}")]
    Validation(#[from] ConfigValidationError),

    #[error("Handler resolution failed: {0}")]
    Resolution(#[from] HandlerResolutionError),
}

/// The category a state field belongs to, used to report name collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCategory {
    Checklist,
    Info,
    SessionVariables,
}

impl std::fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldCategory::Checklist => write!(f, "checklist"),
            FieldCategory::Info => write!(f, "info"),
            FieldCategory::SessionVariables => write!(f, "session_variables"),
        }
    }
}

/// A structural invariant of the flow document that does not hold.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    #[error("Checklist item '{item}' of stage '{stage}' must be a boolean, found '{found}'")]
    ChecklistItemNotBoolean {
        stage: String,
        item: String,
        found: Value,
    },

    #[error("Checklist item '{item}' of stage '{stage}' must start as false")]
    ChecklistItemNotFalse { stage: String, item: String },

    #[error("Field '{field}' is declared in both {first} and {second}")]
    DuplicateField {
        field: String,
        first: FieldCategory,
        second: FieldCategory,
    },

    #[error("Stage '{0}' has no matching node in flow_config.nodes")]
    StageWithoutNode(String),

    #[error("Node '{0}' has no matching stage in state_config.stages")]
    NodeWithoutStage(String),

    #[error("The flow must declare an 'end' node")]
    MissingEndNode,

    #[error("Initial node '{0}' is not declared")]
    UnknownInitialNode(String),

    #[error("The flow declares no node to start from")]
    NoInitialNode,

    #[error("Stage '{stage}' transitions to unknown node '{target}'")]
    UnknownTargetNode { stage: String, target: String },

    #[error("Stage '{stage}' uses unknown operator '{operator}'")]
    UnknownOperator { stage: String, operator: String },

    #[error(
        "Checklist item '{item}' of stage '{stage}' has no matching parameter in the node's primary function{}",
        .function.as_ref().map(|f| format!(" '{}'", f)).unwrap_or_default()
    )]
    ChecklistParameterMissing {
        stage: String,
        item: String,
        function: Option<String>,
    },

    #[error("Node '{node}' references invalid handler '{handler}'")]
    InvalidHandlerId { node: String, handler: String },

    #[error("Variables file '{}' is invalid: {reason}", .path.display())]
    InvalidVariablesFile { path: PathBuf, reason: String },
}

/// Errors raised while turning a handler identifier into something callable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlerResolutionError {
    #[error(
        "'{0}' is not a handler identifier (expected a built-in name or 'activity:<name>')"
    )]
    InvalidHandlerId(String),

    #[error("Activity manifest '{}' not found", .path.display())]
    ActivityManifestNotFound { path: PathBuf },

    #[error("Activity manifest '{}' is invalid: {message}", .path.display())]
    InvalidActivityManifest { path: PathBuf, message: String },

    #[error("Activity plugin '{plugin}' is not registered (registered: {})", .available.join(", "))]
    PluginNotRegistered {
        plugin: String,
        available: Vec<String>,
    },

    #[error("Activity module '{module}' failed to load: {message}")]
    ModuleLoad { module: String, message: String },

    #[error(
        "Activity module '{module}' has no export named '{name}' (available: {})",
        .available.join(", ")
    )]
    ExportNotFound {
        module: String,
        name: String,
        available: Vec<String>,
    },

    #[error("Export '{name}' of activity module '{module}' is not callable")]
    NotCallable { module: String, name: String },
}

/// Errors that occur while evaluating transition logic against live state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Variable '{0}' referenced by a transition condition is not present in info")]
    MissingVariable(String),

    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("No condition matched and no default target node is configured ({conditions} conditions checked)")]
    NoTransition { conditions: usize },

    #[error("Operator '{operator}' cannot compare '{left}' with '{right}'")]
    TypeMismatch {
        operator: String,
        left: Value,
        right: Value,
    },
}

/// Errors a handler can return. These end the owning session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlerError {
    #[error("Transition evaluation for stage '{stage}' failed: {source}")]
    Evaluation {
        stage: String,
        #[source]
        source: EvaluationError,
    },

    #[error("Stage '{0}' does not exist in the session state")]
    UnknownStage(String),

    #[error("{0}")]
    Custom(String),
}

/// Errors surfaced to the conversational runtime while driving a session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Node '{node}' declares no function named '{function}'")]
    UnknownFunction { node: String, function: String },

    #[error("Node '{0}' does not exist")]
    UnknownNode(String),

    #[error("Handler '{handler}' failed: {source}")]
    Handler {
        handler: String,
        #[source]
        source: HandlerError,
    },

    #[error(transparent)]
    Resolution(#[from] HandlerResolutionError),

    #[error("The session has already finished")]
    Finished,
}
