//! Plugin registry for managing enabled plugins

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::plugin::{AuthenticationHooks, Plugin, PluginApi};

/// Registry for enabled plugins and the contributions they made during setup.
///
/// Thread-safe and async-compatible using tokio's RwLock. Registration
/// normally happens once at startup; lookups happen per request.
#[derive(Clone)]
pub struct PluginRegistry {
    plugins: Arc<RwLock<HashMap<String, Arc<dyn Plugin>>>>,
    api: Arc<RwLock<PluginApi>>,
}

impl PluginRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            plugins: Arc::new(RwLock::new(HashMap::new())),
            api: Arc::new(RwLock::new(PluginApi::new())),
        }
    }

    /// Run the plugin's setup and register it.
    ///
    /// A failed setup leaves the registry untouched.
    pub async fn register(&self, plugin: Arc<dyn Plugin>) -> Result<()> {
        let name = plugin.name().to_string();

        let mut plugins = self.plugins.write().await;
        if plugins.contains_key(&name) {
            anyhow::bail!("Plugin '{}' is already registered", name);
        }

        let mut api = self.api.write().await;
        let mut staged = api.clone();
        plugin
            .setup(&mut staged)
            .with_context(|| format!("Setup of plugin '{}' failed", name))?;
        *api = staged;

        plugins.insert(name.clone(), plugin);
        tracing::info!(plugin = %name, "Plugin registered");
        Ok(())
    }

    /// Get a plugin by name
    pub async fn get(&self, name: &str) -> Result<Arc<dyn Plugin>> {
        let plugins = self.plugins.read().await;

        plugins
            .get(name)
            .cloned()
            .with_context(|| format!("Plugin '{}' not found", name))
    }

    /// Names of all registered plugins, sorted
    pub async fn list(&self) -> Vec<String> {
        let plugins = self.plugins.read().await;

        let mut names: Vec<String> = plugins.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a plugin is registered
    pub async fn contains(&self, name: &str) -> bool {
        self.plugins.read().await.contains_key(name)
    }

    /// Snapshot of everything registered plugins contributed
    pub async fn api(&self) -> PluginApi {
        self.api.read().await.clone()
    }

    /// The active authentication provider, if any plugin registered one
    pub async fn authentication(&self) -> Option<Arc<dyn AuthenticationHooks>> {
        self.api.read().await.authentication()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginRoute;

    // Mock plugin for testing
    #[derive(Debug)]
    struct MockPlugin {
        name: String,
        fail: bool,
    }

    impl MockPlugin {
        fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                fail: false,
            }
        }

        fn failing(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                fail: true,
            }
        }
    }

    impl Plugin for MockPlugin {
        fn name(&self) -> &str {
            &self.name
        }

        fn setup(&self, api: &mut PluginApi) -> Result<()> {
            api.register_routes([PluginRoute::new(
                format!("{}.index", self.name),
                format!("/{}/", self.name),
            )]);
            if self.fail {
                anyhow::bail!("missing configuration");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_new_registry_is_empty() {
        let registry = PluginRegistry::new();
        assert!(registry.list().await.is_empty());
        assert!(!registry.contains("test_plugin").await);
        assert!(registry.api().await.routes().is_empty());
        assert!(registry.authentication().await.is_none());
    }

    #[tokio::test]
    async fn test_default_registry_is_empty() {
        let registry = PluginRegistry::default();
        assert!(registry.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_runs_setup() {
        let registry = PluginRegistry::new();
        registry
            .register(Arc::new(MockPlugin::new("test_plugin")))
            .await
            .unwrap();

        assert!(registry.contains("test_plugin").await);
        assert_eq!(
            registry.api().await.route_path("test_plugin.index"),
            Some("/test_plugin/")
        );
    }

    #[tokio::test]
    async fn test_get_plugin() {
        let registry = PluginRegistry::new();
        registry
            .register(Arc::new(MockPlugin::new("test_plugin")))
            .await
            .unwrap();

        let retrieved = registry.get("test_plugin").await.unwrap();
        assert_eq!(retrieved.name(), "test_plugin");
    }

    #[tokio::test]
    async fn test_get_nonexistent_plugin() {
        let registry = PluginRegistry::new();
        let result = registry.get("nonexistent").await;
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Plugin 'nonexistent' not found"));
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let registry = PluginRegistry::new();
        registry
            .register(Arc::new(MockPlugin::new("dup")))
            .await
            .unwrap();
        assert!(registry
            .register(Arc::new(MockPlugin::new("dup")))
            .await
            .is_err());
        assert_eq!(registry.list().await, vec!["dup".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_setup_leaves_registry_untouched() {
        let registry = PluginRegistry::new();
        let err = registry
            .register(Arc::new(MockPlugin::failing("broken")))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Setup of plugin 'broken' failed"));
        assert!(!registry.contains("broken").await);
        assert!(registry.api().await.routes().is_empty());
    }

    #[tokio::test]
    async fn test_list_plugins_sorted() {
        let registry = PluginRegistry::new();
        for name in ["plugin_b", "plugin_c", "plugin_a"] {
            registry
                .register(Arc::new(MockPlugin::new(name)))
                .await
                .unwrap();
        }

        assert_eq!(
            registry.list().await,
            vec!["plugin_a", "plugin_b", "plugin_c"]
        );
        assert_eq!(registry.api().await.routes().len(), 3);
    }

    #[tokio::test]
    async fn test_clone_registry() {
        let registry = PluginRegistry::new();
        registry
            .register(Arc::new(MockPlugin::new("test_plugin")))
            .await
            .unwrap();

        let cloned = registry.clone();
        assert!(cloned.contains("test_plugin").await);
        assert_eq!(cloned.list().await.len(), 1);
    }
}
