//! Plugin registration and shared service construction

use anyhow::{Context, Result};
use galleon_core::{load_or_create_key, Config, TimedSigner, UrlGenerator};
use galleon_db::UserStore;
use galleon_plugins::basic_auth::{self, FP_TOKEN_NAMESPACE};
use galleon_plugins::{BasicAuthPlugin, Plugin, PluginRegistry};
use galleon_services::Mailer;
use std::sync::Arc;

use crate::state::AppState;

/// Plugins shipped with Galleon, by config name
fn builtin_plugin(name: &str, config: &Config, users: &Arc<dyn UserStore>) -> Option<Arc<dyn Plugin>> {
    match name {
        basic_auth::PLUGIN_NAME => Some(Arc::new(BasicAuthPlugin::new(
            users.clone(),
            config.bcrypt_cost,
            config.password_extra_salt.clone(),
        ))),
        _ => None,
    }
}

/// Register enabled plugins and build the shared application state.
pub async fn initialize_services(config: Config, users: Arc<dyn UserStore>) -> Result<Arc<AppState>> {
    let registry = PluginRegistry::new();
    for name in &config.plugins {
        match builtin_plugin(name, &config, &users) {
            Some(plugin) => registry.register(plugin).await?,
            None => tracing::warn!(plugin = %name, "Unknown plugin in config, skipping"),
        }
    }

    let api = registry.api().await;
    let mut urlgen = UrlGenerator::with_core_routes(config.base_url.clone());
    for route in api.routes() {
        urlgen.add_route(route.endpoint.clone(), route.path.clone());
    }

    let mailer = Mailer::from_config(&config.mail).context("Failed to set up mail transport")?;

    let secret = load_or_create_key(&config.crypto_path).with_context(|| {
        format!(
            "Failed to load signing secret from {}",
            config.crypto_path.display()
        )
    })?;
    let fp_signer = TimedSigner::new(&secret, FP_TOKEN_NAMESPACE);

    tracing::info!(
        plugins = %registry.list().await.join(","),
        routes = api.routes().len(),
        "Services initialized"
    );

    Ok(Arc::new(AppState {
        config: Arc::new(config),
        users,
        auth: api.authentication(),
        plugins: registry,
        urlgen: Arc::new(urlgen),
        mailer,
        fp_signer,
    }))
}
