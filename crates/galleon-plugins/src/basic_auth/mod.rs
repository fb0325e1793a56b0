//! Username/password authentication backed by bcrypt.
//!
//! Contributes the password change and forgotten-password routes, their
//! template hooks and static assets, and the authentication hooks used by
//! login and registration.

pub mod tools;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use galleon_core::models::{RegistrationForm, User};
use galleon_core::AppError;
use galleon_db::{NewUser, UserStore};
use serde_json::json;
use validator::Validate;

use crate::plugin::{AuthenticationHooks, Plugin, PluginApi, PluginRoute};

pub use tools::{
    bcrypt_check_password, bcrypt_gen_password_hash, fake_login_attempt,
    send_fp_verification_email, PasswordError, FP_TOKEN_NAMESPACE,
};

pub const PLUGIN_NAME: &str = "basic_auth";

pub const EDIT_PASS: &str = "basic_auth.edit.pass";
pub const FORGOT_PASSWORD: &str = "basic_auth.forgot_password";
pub const VERIFY_FORGOT_PASSWORD: &str = "basic_auth.verify_forgot_password";

const STATIC_NAME: &str = "coreplugin_basic_auth";

/// Authentication hooks for accounts with a local password.
#[derive(Clone)]
pub struct BasicAuth {
    users: Arc<dyn UserStore>,
    bcrypt_cost: u32,
    /// Site-wide salt mixed into passwords of accounts created here
    extra_salt: Option<String>,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish_non_exhaustive()
    }
}

impl BasicAuth {
    pub fn new(users: Arc<dyn UserStore>, bcrypt_cost: u32, extra_salt: Option<String>) -> Self {
        Self {
            users,
            bcrypt_cost,
            extra_salt,
        }
    }
}

// bcrypt is CPU bound; keep it off the async workers
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, PasswordError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

#[async_trait]
impl AuthenticationHooks for BasicAuth {
    #[tracing::instrument(skip(self))]
    async fn get_user(&self, username: &str) -> Result<Option<User>, AppError> {
        if username.is_empty() {
            return Ok(None);
        }
        self.users.get_by_username_or_email(username).await
    }

    #[tracing::instrument(skip(self, form), fields(username = %form.username))]
    async fn create_user(&self, form: &RegistrationForm) -> Result<Option<User>, AppError> {
        if let Some(user) = self.get_user(&form.username).await? {
            return Ok(Some(user));
        }
        let Some(password) = form.password.as_deref() else {
            return Ok(None);
        };
        form.validate()?;

        let pw_hash = self
            .gen_password_hash(password, self.extra_salt.as_deref())
            .await?;
        let user = self
            .users
            .create(NewUser {
                username: form.username.clone(),
                email: form.email.clone(),
                pw_hash: Some(pw_hash),
            })
            .await?;
        Ok(Some(user))
    }

    async fn gen_password_hash(
        &self,
        raw_pass: &str,
        extra_salt: Option<&str>,
    ) -> Result<String, AppError> {
        let raw_pass = raw_pass.to_string();
        let extra_salt = extra_salt.map(str::to_string);
        let cost = self.bcrypt_cost;
        blocking(move || bcrypt_gen_password_hash(&raw_pass, extra_salt.as_deref(), cost)).await
    }

    async fn check_password(
        &self,
        raw_pass: &str,
        stored_hash: Option<&str>,
        extra_salt: Option<&str>,
    ) -> Result<Option<bool>, AppError> {
        let Some(stored_hash) = stored_hash.filter(|h| !h.is_empty()) else {
            return Ok(None);
        };
        let raw_pass = raw_pass.to_string();
        let stored_hash = stored_hash.to_string();
        let extra_salt = extra_salt.map(str::to_string);
        blocking(move || bcrypt_check_password(&raw_pass, &stored_hash, extra_salt.as_deref()))
            .await
            .map(Some)
    }

    async fn fake_login_attempt(&self) {
        if let Err(e) = tokio::task::spawn_blocking(fake_login_attempt).await {
            tracing::warn!(error = %e, "Fake login attempt task failed");
        }
    }
}

/// The basic_auth plugin.
#[derive(Debug, Clone)]
pub struct BasicAuthPlugin {
    hooks: Arc<BasicAuth>,
}

impl BasicAuthPlugin {
    pub fn new(users: Arc<dyn UserStore>, bcrypt_cost: u32, extra_salt: Option<String>) -> Self {
        Self {
            hooks: Arc::new(BasicAuth::new(users, bcrypt_cost, extra_salt)),
        }
    }

    pub fn hooks(&self) -> Arc<BasicAuth> {
        self.hooks.clone()
    }
}

impl Plugin for BasicAuthPlugin {
    fn name(&self) -> &str {
        PLUGIN_NAME
    }

    fn setup(&self, api: &mut PluginApi) -> Result<()> {
        let plugin_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

        api.register_routes([
            PluginRoute::new(EDIT_PASS, "/edit/password/"),
            PluginRoute::new(FORGOT_PASSWORD, "/auth/forgot_password/"),
            PluginRoute::new(VERIFY_FORGOT_PASSWORD, "/auth/forgot_password/verify/"),
        ]);
        api.register_template_path(plugin_dir.join("templates"));
        api.register_template_hooks([
            ("edit_link", "galleon/plugins/basic_auth/edit_link.html"),
            ("fp_link", "galleon/plugins/basic_auth/fp_link.html"),
            ("fp_head", "galleon/plugins/basic_auth/fp_head.html"),
            (
                "create_account",
                "galleon/plugins/basic_auth/create_account_link.html",
            ),
        ]);
        api.register_static(STATIC_NAME, plugin_dir.join("static").join("basic_auth"));
        api.add_global_context("pass_auth", json!(true));
        api.register_authentication(self.hooks.clone());

        tracing::debug!("basic_auth plugin set up");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PluginRegistry;
    use crate::test_helpers::MockUserStore;

    const TEST_COST: u32 = 4;

    fn form(username: &str, password: Option<&str>) -> RegistrationForm {
        RegistrationForm {
            username: username.to_string(),
            email: format!("{}@example.org", username),
            password: password.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn setup_registers_routes_hooks_and_context() {
        let registry = PluginRegistry::new();
        let plugin = BasicAuthPlugin::new(Arc::new(MockUserStore::new()), TEST_COST, None);
        registry.register(Arc::new(plugin)).await.unwrap();

        let api = registry.api().await;
        assert_eq!(api.route_path(EDIT_PASS), Some("/edit/password/"));
        assert_eq!(api.route_path(FORGOT_PASSWORD), Some("/auth/forgot_password/"));
        assert_eq!(
            api.route_path(VERIFY_FORGOT_PASSWORD),
            Some("/auth/forgot_password/verify/")
        );
        for hook in ["edit_link", "fp_link", "fp_head", "create_account"] {
            assert_eq!(api.template_hooks(hook).len(), 1, "hook {}", hook);
        }
        assert_eq!(api.static_dirs()[0].name, "coreplugin_basic_auth");
        assert!(api.static_dirs()[0].path.ends_with("static/basic_auth"));
        assert!(api.template_paths()[0].join("galleon/plugins/basic_auth/fp_link.html").exists());
        assert_eq!(api.global_context()["pass_auth"], json!(true));
        assert!(registry.authentication().await.is_some());
    }

    #[tokio::test]
    async fn get_user_matches_username_or_email() {
        let store = Arc::new(MockUserStore::new());
        let chris = store.insert_user("chris", "chris@example.org", None);
        let hooks = BasicAuth::new(store, TEST_COST, None);

        assert_eq!(hooks.get_user("chris").await.unwrap().map(|u| u.id), Some(chris.id));
        assert_eq!(
            hooks.get_user("chris@example.org").await.unwrap().map(|u| u.id),
            Some(chris.id)
        );
        assert!(hooks.get_user("nobody").await.unwrap().is_none());
        assert!(hooks.get_user("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_user_hashes_password() {
        let store = Arc::new(MockUserStore::new());
        let hooks = BasicAuth::new(store.clone(), TEST_COST, None);

        let user = hooks
            .create_user(&form("sam", Some("correct horse")))
            .await
            .unwrap()
            .unwrap();
        let stored = user.pw_hash.as_deref().unwrap();
        assert_ne!(stored, "correct horse");
        assert_eq!(
            hooks.check_password("correct horse", Some(stored), None).await.unwrap(),
            Some(true)
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn create_user_returns_existing_account() {
        let store = Arc::new(MockUserStore::new());
        let existing = store.insert_user("sam", "sam@example.org", None);
        let hooks = BasicAuth::new(store.clone(), TEST_COST, None);

        let user = hooks
            .create_user(&form("sam", Some("another pass")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, existing.id);
        assert!(user.pw_hash.is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn create_user_without_password_creates_nothing() {
        let store = Arc::new(MockUserStore::new());
        let hooks = BasicAuth::new(store.clone(), TEST_COST, None);

        assert!(hooks.create_user(&form("sam", None)).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn create_user_rejects_invalid_form() {
        let hooks = BasicAuth::new(Arc::new(MockUserStore::new()), TEST_COST, None);
        let mut bad = form("sam", Some("pw"));
        bad.email = "nope".to_string();
        assert!(matches!(
            hooks.create_user(&bad).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn create_user_applies_site_salt() {
        let store = Arc::new(MockUserStore::new());
        let hooks = BasicAuth::new(store, TEST_COST, Some("site-salt".to_string()));
        let user = hooks
            .create_user(&form("sam", Some("correct horse")))
            .await
            .unwrap()
            .unwrap();
        let stored = user.pw_hash.as_deref();
        assert_eq!(
            hooks.check_password("correct horse", stored, Some("site-salt")).await.unwrap(),
            Some(true)
        );
        assert_eq!(
            hooks.check_password("correct horse", stored, None).await.unwrap(),
            Some(false)
        );
    }

    #[tokio::test]
    async fn check_password_without_stored_hash_is_none() {
        let hooks = BasicAuth::new(Arc::new(MockUserStore::new()), TEST_COST, None);
        assert_eq!(hooks.check_password("pw", None, None).await.unwrap(), None);
        assert_eq!(hooks.check_password("pw", Some(""), None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn check_password_honours_extra_salt() {
        let hooks = BasicAuth::new(Arc::new(MockUserStore::new()), TEST_COST, None);
        let hash = hooks.gen_password_hash("secret", Some("site-salt")).await.unwrap();
        assert_eq!(
            hooks.check_password("secret", Some(&hash), Some("site-salt")).await.unwrap(),
            Some(true)
        );
        assert_eq!(
            hooks.check_password("secret", Some(&hash), None).await.unwrap(),
            Some(false)
        );
    }

    #[tokio::test]
    async fn fake_login_attempt_returns() {
        let hooks = BasicAuth::new(Arc::new(MockUserStore::new()), TEST_COST, None);
        hooks.fake_login_attempt().await;
    }
}
