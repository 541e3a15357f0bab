use crate::error::HandlerResolutionError;
use crate::handlers::{
    Handler, InfoVariableHandler, ProgressHandler, SessionVariableHandler, VariableActionHandler,
};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Prefix that marks a handler supplied by an activity plugin.
pub const ACTIVITY_PREFIX: &str = "activity:";

/// Master macro to define the built-in handlers, their identifiers and their construction.
macro_rules! define_builtin_handlers {
    ( $( ($variant:ident, $id:literal, $handler:expr) ),* $(,)? ) => {
        /// Handlers that ship with the engine.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum BuiltinHandler {
            $( $variant, )*
        }

        impl BuiltinHandler {
            pub const ALL: &'static [BuiltinHandler] = &[ $( BuiltinHandler::$variant, )* ];

            /// The identifier flow documents use for this handler.
            pub fn id(&self) -> &'static str {
                match self {
                    $( BuiltinHandler::$variant => $id, )*
                }
            }

            pub fn from_id(id: &str) -> Option<Self> {
                match id {
                    $( $id => Some(BuiltinHandler::$variant), )*
                    _ => None,
                }
            }

            pub(crate) fn instantiate(&self) -> Arc<dyn Handler> {
                match self {
                    $( BuiltinHandler::$variant => Arc::new($handler), )*
                }
            }
        }
    };
}

define_builtin_handlers! {
    (General, "general_handler", ProgressHandler),
    (GetInfoVariable, "get_info_variable_handler", InfoVariableHandler),
    (GetSessionVariable, "get_session_variable_handler", SessionVariableHandler),
    (GetVariableAction, "get_variable_action_handler", VariableActionHandler),
}

/// A parsed handler identifier: an exact built-in name or `activity:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HandlerId {
    Builtin(BuiltinHandler),
    Activity(String),
}

impl FromStr for HandlerId {
    type Err = HandlerResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(name) = s.strip_prefix(ACTIVITY_PREFIX) {
            let valid = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '-');
            return if valid {
                Ok(HandlerId::Activity(name.to_string()))
            } else {
                Err(HandlerResolutionError::InvalidHandlerId(s.to_string()))
            };
        }
        BuiltinHandler::from_id(s)
            .map(HandlerId::Builtin)
            .ok_or_else(|| HandlerResolutionError::InvalidHandlerId(s.to_string()))
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerId::Builtin(builtin) => f.write_str(builtin.id()),
            HandlerId::Activity(name) => write!(f, "{}{}", ACTIVITY_PREFIX, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_ids_round_trip() {
        for builtin in BuiltinHandler::ALL {
            let parsed: HandlerId = builtin.id().parse().unwrap();
            assert_eq!(parsed, HandlerId::Builtin(*builtin));
            assert_eq!(parsed.to_string(), builtin.id());
        }
    }

    #[test]
    fn activity_ids_keep_their_name() {
        let parsed: HandlerId = "activity:grade_answer".parse().unwrap();
        assert_eq!(parsed, HandlerId::Activity("grade_answer".to_string()));
        assert_eq!(parsed.to_string(), "activity:grade_answer");
    }

    #[test]
    fn anything_else_is_rejected() {
        for bad in ["", "activity:", "activity:two words", "General_Handler", "custom"] {
            assert_eq!(
                bad.parse::<HandlerId>(),
                Err(HandlerResolutionError::InvalidHandlerId(bad.to_string())),
                "{:?} should not parse",
                bad
            );
        }
    }
}
