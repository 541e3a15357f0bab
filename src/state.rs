use crate::config::{FlowConfiguration, Stage};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The mutable state bag of one session.
///
/// Seeded from a [`FlowConfiguration`] and afterwards changed only by handler
/// invocations from the session's own turn loop.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub stages: IndexMap<String, Stage>,
    pub info: IndexMap<String, Value>,
    pub session_variables: IndexMap<String, Value>,
}

impl SessionState {
    pub fn from_config(config: &FlowConfiguration) -> Self {
        Self {
            stages: config.state_config.stages.clone(),
            info: config.state_config.info.clone(),
            session_variables: config.state_config.session_variables.clone(),
        }
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.get(name)
    }

    pub fn stage_mut(&mut self, name: &str) -> Option<&mut Stage> {
        self.stages.get_mut(name)
    }
}
