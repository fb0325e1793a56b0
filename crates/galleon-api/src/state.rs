//! Application state shared by all handlers.

use std::sync::Arc;

use galleon_core::{AppError, Config, TimedSigner, UrlGenerator};
use galleon_db::UserStore;
use galleon_plugins::{AuthenticationHooks, PluginRegistry};
use galleon_services::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserStore>,
    pub plugins: PluginRegistry,
    /// Provider registered by an enabled authentication plugin
    pub auth: Option<Arc<dyn AuthenticationHooks>>,
    pub urlgen: Arc<UrlGenerator>,
    pub mailer: Mailer,
    /// Signs and checks password reset tokens
    pub fp_signer: TimedSigner,
}

impl AppState {
    /// The authentication provider, or an error when no plugin supplied one
    pub fn auth(&self) -> Result<&Arc<dyn AuthenticationHooks>, AppError> {
        self.auth
            .as_ref()
            .ok_or_else(|| AppError::Internal("No authentication plugin enabled".to_string()))
    }

    pub fn extra_salt(&self) -> Option<&str> {
        self.config.password_extra_salt.as_deref()
    }
}
