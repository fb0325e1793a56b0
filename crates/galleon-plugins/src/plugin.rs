//! Plugin system core infrastructure
//!
//! Plugins never touch the router or template engine directly. During setup
//! they describe what they contribute (routes, template paths and hooks,
//! static directories, global template context, authentication) on a
//! [`PluginApi`], and the host wires those contributions in.

use anyhow::Result;
use async_trait::async_trait;
use galleon_core::models::{RegistrationForm, User};
use galleon_core::AppError;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

/// A named route contributed by a plugin.
///
/// `path` uses `{param}` placeholders and is used both to mount the handler
/// and to generate links to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginRoute {
    pub endpoint: String,
    pub path: String,
}

impl PluginRoute {
    pub fn new(endpoint: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            path: path.into(),
        }
    }
}

/// A directory of static assets served under the plugin's name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginStatic {
    pub name: String,
    pub path: PathBuf,
}

/// Authentication provider hooks.
///
/// At most one provider is active; the last plugin to register wins.
#[async_trait]
pub trait AuthenticationHooks: Send + Sync + Debug {
    /// Look up the account a login name refers to
    async fn get_user(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Create an account from a registration form, or return the existing one
    async fn create_user(&self, form: &RegistrationForm) -> Result<Option<User>, AppError>;

    async fn gen_password_hash(
        &self,
        raw_pass: &str,
        extra_salt: Option<&str>,
    ) -> Result<String, AppError>;

    /// `None` when the account has no stored hash to check against
    async fn check_password(
        &self,
        raw_pass: &str,
        stored_hash: Option<&str>,
        extra_salt: Option<&str>,
    ) -> Result<Option<bool>, AppError>;

    /// Spend about as long as a real password check, checking nothing
    async fn fake_login_attempt(&self);
}

/// Everything plugins contributed during setup.
#[derive(Debug, Clone, Default)]
pub struct PluginApi {
    routes: Vec<PluginRoute>,
    template_paths: Vec<PathBuf>,
    template_hooks: HashMap<String, Vec<String>>,
    static_dirs: Vec<PluginStatic>,
    global_context: Map<String, JsonValue>,
    authentication: Option<Arc<dyn AuthenticationHooks>>,
}

impl PluginApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_routes(&mut self, routes: impl IntoIterator<Item = PluginRoute>) {
        for route in routes {
            if let Some(existing) = self.routes.iter_mut().find(|r| r.endpoint == route.endpoint) {
                tracing::warn!(endpoint = %route.endpoint, "Route registered twice, keeping the latest");
                *existing = route;
            } else {
                self.routes.push(route);
            }
        }
    }

    pub fn register_template_path(&mut self, path: impl Into<PathBuf>) {
        self.template_paths.push(path.into());
    }

    /// Attach templates to named hook points; several plugins may share a hook.
    pub fn register_template_hooks<'a>(
        &mut self,
        hooks: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) {
        for (hook, template) in hooks {
            self.template_hooks
                .entry(hook.to_string())
                .or_default()
                .push(template.to_string());
        }
    }

    pub fn register_static(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.static_dirs.push(PluginStatic {
            name: name.into(),
            path: path.into(),
        });
    }

    /// Add a key to the context every template is rendered with
    pub fn add_global_context(&mut self, key: impl Into<String>, value: JsonValue) {
        self.global_context.insert(key.into(), value);
    }

    pub fn register_authentication(&mut self, hooks: Arc<dyn AuthenticationHooks>) {
        if self.authentication.is_some() {
            tracing::warn!("Replacing previously registered authentication provider");
        }
        self.authentication = Some(hooks);
    }

    pub fn routes(&self) -> &[PluginRoute] {
        &self.routes
    }

    pub fn route_path(&self, endpoint: &str) -> Option<&str> {
        self.routes
            .iter()
            .find(|r| r.endpoint == endpoint)
            .map(|r| r.path.as_str())
    }

    pub fn template_paths(&self) -> &[PathBuf] {
        &self.template_paths
    }

    /// Templates attached to `hook`, in registration order
    pub fn template_hooks(&self, hook: &str) -> &[String] {
        self.template_hooks
            .get(hook)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn static_dirs(&self) -> &[PluginStatic] {
        &self.static_dirs
    }

    pub fn global_context(&self) -> &Map<String, JsonValue> {
        &self.global_context
    }

    pub fn authentication(&self) -> Option<Arc<dyn AuthenticationHooks>> {
        self.authentication.clone()
    }
}

/// Trait that all plugins must implement
pub trait Plugin: Send + Sync + Debug {
    /// Get the plugin name/identifier
    fn name(&self) -> &str;

    /// Describe the plugin's contributions on `api`
    fn setup(&self, api: &mut PluginApi) -> Result<()>;
}
