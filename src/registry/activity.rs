use crate::error::HandlerResolutionError;
use crate::handlers::Handler;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// File name of the activity manifest that sits next to a flow document.
pub const ACTIVITY_MANIFEST_FILE: &str = "handlers.json";

/// Declares which registered plugin provides an activity's custom handlers.
///
/// Lives at `<flow directory>/handlers.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityManifest {
    /// Name the plugin was registered under.
    pub plugin: String,
    /// Free-form configuration handed to the plugin when it loads.
    #[serde(default)]
    pub settings: Value,
}

impl ActivityManifest {
    pub fn from_file(path: &Path) -> Result<Self, HandlerResolutionError> {
        if !path.is_file() {
            return Err(HandlerResolutionError::ActivityManifestNotFound {
                path: path.to_path_buf(),
            });
        }
        let content =
            fs::read_to_string(path).map_err(|e| HandlerResolutionError::InvalidActivityManifest {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        serde_json::from_str(&content).map_err(|e| HandlerResolutionError::InvalidActivityManifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// What a plugin sees when it is asked to load an activity.
pub struct ActivityContext<'a> {
    /// Unique key of the module being loaded.
    pub module_key: &'a str,
    /// Directory holding the flow document and its manifest.
    pub directory: &'a Path,
    pub settings: &'a Value,
}

/// A statically linked provider of activity handlers.
///
/// `load` runs at most once per activity directory for the lifetime of a
/// [`Registry`](super::Registry); anything it sets up is shared by every
/// session using that activity.
pub trait ActivityPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn load(&self, ctx: &ActivityContext<'_>) -> Result<ActivityModule, String>;
}

/// A named item an activity module makes available.
#[derive(Clone)]
pub enum Export {
    Handler(Arc<dyn Handler>),
    /// Plain data. Naming one as a handler is a resolution error.
    Value(Value),
}

/// The set of exports produced by loading one activity.
#[derive(Clone, Default)]
pub struct ActivityModule {
    exports: IndexMap<String, Export>,
}

impl ActivityModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(mut self, name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.exports
            .insert(name.into(), Export::Handler(Arc::new(handler)));
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.exports.insert(name.into(), Export::Value(value));
        self
    }

    pub fn export(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }

    pub fn export_names(&self) -> Vec<String> {
        self.exports.keys().cloned().collect()
    }
}

/// A module after loading, tagged with the key it was loaded under.
pub(crate) struct LoadedActivity {
    pub(crate) key: String,
    pub(crate) module: ActivityModule,
}

impl LoadedActivity {
    pub(crate) fn handler(&self, name: &str) -> Result<Arc<dyn Handler>, HandlerResolutionError> {
        match self.module.export(name) {
            Some(Export::Handler(handler)) => Ok(handler.clone()),
            Some(Export::Value(_)) => Err(HandlerResolutionError::NotCallable {
                module: self.key.clone(),
                name: name.to_string(),
            }),
            None => Err(HandlerResolutionError::ExportNotFound {
                module: self.key.clone(),
                name: name.to_string(),
                available: self.module.export_names(),
            }),
        }
    }
}

/// Derives the unique key an activity module is loaded under, so two
/// activities exporting the same handler name never collide.
pub(crate) fn module_key(plugin: &str, directory: &Path) -> String {
    format!("activity::{}::{}", plugin, directory.display())
}
