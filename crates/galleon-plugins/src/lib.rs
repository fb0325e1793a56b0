//! Plugin host API, registry and bundled plugins.

pub mod basic_auth;
pub mod plugin;
pub mod registry;
pub mod test_helpers;

pub use basic_auth::BasicAuthPlugin;
pub use plugin::{AuthenticationHooks, Plugin, PluginApi, PluginRoute, PluginStatic};
pub use registry::PluginRegistry;
