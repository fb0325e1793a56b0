#![allow(dead_code)]

//! Test helpers: build AppState and router for integration tests.
//!
//! Users live in an in-memory store and outgoing mail is captured, so these
//! tests need neither Postgres nor an SMTP server.

use async_trait::async_trait;
use axum_test::TestServer;
use galleon_api::setup::{routes, services};
use galleon_api::AppState;
use galleon_core::models::{RegistrationForm, User};
use galleon_core::{AppError, Config};
use galleon_plugins::basic_auth::bcrypt_gen_password_hash;
use galleon_plugins::test_helpers::MockUserStore;
use galleon_plugins::AuthenticationHooks;
use galleon_services::{CapturedEmail, MailCapture};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_BCRYPT_COST: u32 = 4;
pub const BASE_URL: &str = "http://galleon.test";

/// Test application: server plus handles on its in-memory collaborators.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub users: MockUserStore,
    pub mail: MailCapture,
    pub _crypto_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Add an account with the given password and verification status
    pub fn add_user(&self, username: &str, password: &str, verified: bool) -> User {
        let pw_hash = bcrypt_gen_password_hash(password, None, TEST_BCRYPT_COST)
            .expect("hash test password");
        let user = self.users.insert_user(
            username,
            &format!("{}@example.org", username),
            Some(&pw_hash),
        );
        self.users.set_email_verified(user.id, verified);
        self.users.user(user.id).expect("user just inserted")
    }

    pub fn sent_mail(&self) -> Vec<CapturedEmail> {
        self.mail.messages()
    }
}

pub fn test_config(crypto_dir: &TempDir) -> Config {
    let mut config = Config {
        base_url: BASE_URL.to_string(),
        crypto_path: crypto_dir.path().join("crypto"),
        bcrypt_cost: TEST_BCRYPT_COST,
        ..Config::default()
    };
    config.mail.tests_enabled = true;
    config.mail.debug_mode = false;
    config
}

pub async fn setup_test_app() -> TestApp {
    let crypto_dir = tempfile::tempdir().expect("create temp dir");
    setup_test_app_with(test_config(&crypto_dir), crypto_dir).await
}

pub async fn setup_test_app_with(config: Config, crypto_dir: TempDir) -> TestApp {
    build_test_app(config, crypto_dir, |_| {}).await
}

/// Test app whose auth provider counts calls to `fake_login_attempt`
pub async fn setup_test_app_counting_fake_logins() -> (TestApp, Arc<AtomicUsize>) {
    let crypto_dir = tempfile::tempdir().expect("create temp dir");
    let config = test_config(&crypto_dir);
    let fake_logins = Arc::new(AtomicUsize::new(0));
    let counter = fake_logins.clone();
    let app = build_test_app(config, crypto_dir, move |state| {
        let inner = state.auth.clone().expect("basic_auth enabled");
        state.auth = Some(Arc::new(CountingAuth {
            inner,
            fake_logins: counter,
        }));
    })
    .await;
    (app, fake_logins)
}

async fn build_test_app(
    config: Config,
    crypto_dir: TempDir,
    customize: impl FnOnce(&mut AppState),
) -> TestApp {
    let users = MockUserStore::new();
    let state = services::initialize_services(config, Arc::new(users.clone()))
        .await
        .expect("initialize services");
    let mut state = (*state).clone();
    customize(&mut state);
    let state = Arc::new(state);

    let mail = state
        .mailer
        .capture()
        .cloned()
        .unwrap_or_default();
    let router = routes::setup_routes(state.clone())
        .await
        .expect("setup routes");
    let server = TestServer::new(router.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        users,
        mail,
        _crypto_dir: crypto_dir,
    }
}

/// Delegates to the real provider, counting fake login attempts
#[derive(Debug)]
struct CountingAuth {
    inner: Arc<dyn AuthenticationHooks>,
    fake_logins: Arc<AtomicUsize>,
}

#[async_trait]
impl AuthenticationHooks for CountingAuth {
    async fn get_user(&self, username: &str) -> Result<Option<User>, AppError> {
        self.inner.get_user(username).await
    }

    async fn create_user(&self, form: &RegistrationForm) -> Result<Option<User>, AppError> {
        self.inner.create_user(form).await
    }

    async fn gen_password_hash(
        &self,
        raw_pass: &str,
        extra_salt: Option<&str>,
    ) -> Result<String, AppError> {
        self.inner.gen_password_hash(raw_pass, extra_salt).await
    }

    async fn check_password(
        &self,
        raw_pass: &str,
        stored_hash: Option<&str>,
        extra_salt: Option<&str>,
    ) -> Result<Option<bool>, AppError> {
        self.inner
            .check_password(raw_pass, stored_hash, extra_salt)
            .await
    }

    async fn fake_login_attempt(&self) {
        self.fake_logins.fetch_add(1, Ordering::SeqCst);
        self.inner.fake_login_attempt().await;
    }
}

/// Pull the reset token out of a password reset email
pub fn token_from_email(email: &CapturedEmail) -> String {
    let start = email.body.find("token=").expect("email contains a token") + "token=".len();
    email.body[start..]
        .split_whitespace()
        .next()
        .expect("token is not empty")
        .to_string()
}
