//! Maps handler identifiers to callable behavior.
//!
//! A [`Registry`] is created once per process (or per test) and shared by
//! reference between sessions. Built-in handlers are instantiated up front;
//! activity handlers are loaded lazily from registered [`ActivityPlugin`]s
//! and cached.
//!
//! # Concurrency
//!
//! `Registry` is `Send + Sync`. Resolution may run concurrently from several
//! sessions. Each activity directory is loaded at most once: concurrent first
//! accesses wait for the same load instead of running the plugin twice. A load
//! that fails is not cached, so a later resolution retries it.

use crate::error::HandlerResolutionError;
use crate::handlers::Handler;
use ahash::AHashMap;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

mod activity;
mod handler_id;

pub use activity::{
    ACTIVITY_MANIFEST_FILE, ActivityContext, ActivityManifest, ActivityModule, ActivityPlugin,
    Export,
};
pub use handler_id::{ACTIVITY_PREFIX, BuiltinHandler, HandlerId};

use activity::{LoadedActivity, module_key};

type ActivitySlot = Arc<OnceCell<Arc<LoadedActivity>>>;

pub struct Registry {
    builtins: AHashMap<BuiltinHandler, Arc<dyn Handler>>,
    plugins: AHashMap<String, Arc<dyn ActivityPlugin>>,
    // Key: canonical activity directory
    activities: DashMap<PathBuf, ActivitySlot>,
    // Key: (canonical config path, handler id)
    resolved: DashMap<(PathBuf, String), Arc<dyn Handler>>,
}

pub struct RegistryBuilder {
    plugins: AHashMap<String, Arc<dyn ActivityPlugin>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            plugins: AHashMap::new(),
        }
    }

    /// Registers a plugin under its own name. A later plugin with the same
    /// name replaces the earlier one.
    pub fn with_activity_plugin(mut self, plugin: impl ActivityPlugin + 'static) -> Self {
        self.plugins
            .insert(plugin.name().to_string(), Arc::new(plugin));
        self
    }

    pub fn build(self) -> Registry {
        let builtins = BuiltinHandler::ALL
            .iter()
            .map(|builtin| (*builtin, builtin.instantiate()))
            .collect();
        Registry {
            builtins,
            plugins: self.plugins,
            activities: DashMap::new(),
            resolved: DashMap::new(),
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// A registry with only the built-in handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `handler_id` for the flow document at `config_path`.
    ///
    /// Built-in names resolve to shared instances. `activity:<name>` loads
    /// the activity next to `config_path` (once) and returns its export
    /// `<name>`. Repeated calls with the same arguments return the same
    /// handler instance.
    pub fn resolve(
        &self,
        handler_id: &str,
        config_path: &Path,
    ) -> Result<Arc<dyn Handler>, HandlerResolutionError> {
        let id: HandlerId = handler_id.parse()?;
        self.resolve_id(&id, config_path)
    }

    pub fn resolve_id(
        &self,
        id: &HandlerId,
        config_path: &Path,
    ) -> Result<Arc<dyn Handler>, HandlerResolutionError> {
        let name = match id {
            HandlerId::Builtin(builtin) => return Ok(self.builtin(*builtin)),
            HandlerId::Activity(name) => name,
        };

        let config_path = canonical(config_path);
        let cache_key = (config_path.clone(), id.to_string());
        if let Some(handler) = self.resolved.get(&cache_key) {
            return Ok(handler.clone());
        }

        let activity = self.load_activity(&config_path)?;
        let handler = activity.handler(name)?;
        debug!(module = %activity.key, handler = %name, "Resolved activity handler");

        // A concurrent resolver may have won the race; keep its entry.
        let entry = self.resolved.entry(cache_key).or_insert(handler);
        Ok(entry.value().clone())
    }

    /// Names of the registered activity plugins, sorted.
    pub fn plugin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of activity modules loaded so far.
    pub fn loaded_activity_count(&self) -> usize {
        self.activities
            .iter()
            .filter(|slot| slot.value().get().is_some())
            .count()
    }

    fn builtin(&self, builtin: BuiltinHandler) -> Arc<dyn Handler> {
        match self.builtins.get(&builtin) {
            Some(handler) => handler.clone(),
            None => builtin.instantiate(),
        }
    }

    fn load_activity(&self, config_path: &Path) -> Result<Arc<LoadedActivity>, HandlerResolutionError> {
        let directory = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        // Clone the slot out so the map shard is not locked while loading.
        let slot: ActivitySlot = self
            .activities
            .entry(directory.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        slot.get_or_try_init(|| self.instantiate_activity(directory))
            .cloned()
    }

    fn instantiate_activity(&self, directory: PathBuf) -> Result<Arc<LoadedActivity>, HandlerResolutionError> {
        let manifest = ActivityManifest::from_file(&directory.join(ACTIVITY_MANIFEST_FILE))?;
        let plugin = self.plugins.get(&manifest.plugin).ok_or_else(|| {
            HandlerResolutionError::PluginNotRegistered {
                plugin: manifest.plugin.clone(),
                available: self.plugin_names(),
            }
        })?;

        let key = module_key(&manifest.plugin, &directory);
        let ctx = ActivityContext {
            module_key: &key,
            directory: &directory,
            settings: &manifest.settings,
        };
        let module = plugin
            .load(&ctx)
            .map_err(|message| HandlerResolutionError::ModuleLoad {
                module: key.clone(),
                message,
            })?;

        info!(
            module = %key,
            directory = %directory.display(),
            exports = module.export_names().len(),
            "Loaded activity module"
        );
        Ok(Arc::new(LoadedActivity { key, module }))
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
