//! Configuration module
//!
//! Configuration is read from the process environment (optionally seeded from a
//! `.env` file) into typed structures with constant defaults.

use std::env;
use std::path::PathBuf;

const SERVER_PORT: u16 = 6543;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const SMTP_DEFAULT_PORT: u16 = 25;
const FP_TOKEN_MAX_AGE_SECS: u64 = 10 * 24 * 3600;

/// Outbound mail settings.
#[derive(Clone, Debug)]
pub struct MailConfig {
    /// Address used in the `From:` header of every outgoing message
    pub sender_address: String,
    /// Print messages instead of delivering them
    pub debug_mode: bool,
    /// Capture messages in memory instead of delivering them
    pub tests_enabled: bool,
    /// Empty means localhost
    pub smtp_host: String,
    /// 0 means the SMTP default port
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_pass: Option<String>,
    pub smtp_starttls: bool,
}

impl MailConfig {
    /// Host to connect to, falling back to localhost
    pub fn effective_host(&self) -> &str {
        if self.smtp_host.trim().is_empty() {
            "localhost"
        } else {
            self.smtp_host.trim()
        }
    }

    /// Port to connect to, falling back to the SMTP default
    pub fn effective_port(&self) -> u16 {
        if self.smtp_port == 0 {
            SMTP_DEFAULT_PORT
        } else {
            self.smtp_port
        }
    }

    /// Whether credentials should be presented to the server
    pub fn wants_login(&self) -> bool {
        self.smtp_user.as_deref().is_some_and(|u| !u.is_empty())
            || self.smtp_pass.as_deref().is_some_and(|p| !p.is_empty())
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender_address: "notice@galleon.example.org".to_string(),
            debug_mode: true,
            tests_enabled: false,
            smtp_host: String::new(),
            smtp_port: 0,
            smtp_user: None,
            smtp_pass: None,
            smtp_starttls: false,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Scheme and host used for fully qualified URLs, e.g. `https://media.example.org`
    pub base_url: String,
    /// Base URL of static assets
    pub static_base_url: String,
    /// Base URL of user-uploaded files
    pub public_store_base_url: String,
    pub site_name: String,
    /// Directory holding the signing secret
    pub crypto_path: PathBuf,
    /// Enabled media types, e.g. `image,video`
    pub media_types: Vec<String>,
    /// Enabled plugins, e.g. `basic_auth`
    pub plugins: Vec<String>,
    /// Optional site-wide salt mixed into password hashes
    pub password_extra_salt: Option<String>,
    pub bcrypt_cost: u32,
    pub fp_token_max_age_secs: u64,
    pub mail: MailConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server_port: SERVER_PORT,
            database_url: String::new(),
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            base_url: format!("http://localhost:{}", SERVER_PORT),
            static_base_url: "/mgoblin_static/".to_string(),
            public_store_base_url: "/mgoblin_media/".to_string(),
            site_name: "Galleon".to_string(),
            crypto_path: PathBuf::from("user_dev/crypto"),
            media_types: vec!["image".to_string()],
            plugins: vec!["basic_auth".to_string()],
            password_extra_salt: None,
            bcrypt_cost: 12,
            fp_token_max_age_secs: FP_TOKEN_MAX_AGE_SECS,
            mail: MailConfig::default(),
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_list(name: &str, default: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or(defaults.environment);

        let server_port = env::var("SERVER_PORT")
            .or_else(|_| env::var("PORT"))
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(SERVER_PORT);

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(MAX_CONNECTIONS);

        let db_timeout_seconds = env::var("DB_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(CONNECTION_TIMEOUT_SECS);

        let bcrypt_cost = env::var("BCRYPT_COST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.bcrypt_cost);

        let fp_token_max_age_secs = env::var("FP_TOKEN_MAX_AGE_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(FP_TOKEN_MAX_AGE_SECS);

        let mail = MailConfig {
            sender_address: env::var("EMAIL_SENDER_ADDRESS")
                .unwrap_or(defaults.mail.sender_address),
            debug_mode: env_bool("EMAIL_DEBUG_MODE", true),
            tests_enabled: env_bool("TESTS_ENABLED", false),
            smtp_host: env::var("EMAIL_SMTP_HOST").unwrap_or_default(),
            smtp_port: env::var("EMAIL_SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(0),
            smtp_user: env_opt("EMAIL_SMTP_USER"),
            smtp_pass: env_opt("EMAIL_SMTP_PASS"),
            smtp_starttls: env_bool("EMAIL_SMTP_FORCE_STARTTLS", false),
        };

        Ok(Config {
            environment,
            server_port,
            database_url,
            db_max_connections,
            db_timeout_seconds,
            base_url: env::var("BASE_URL").unwrap_or(defaults.base_url),
            static_base_url: env::var("STATIC_BASE_URL").unwrap_or(defaults.static_base_url),
            public_store_base_url: env::var("PUBLIC_STORE_BASE_URL")
                .unwrap_or(defaults.public_store_base_url),
            site_name: env::var("SITE_NAME").unwrap_or(defaults.site_name),
            crypto_path: env::var("CRYPTO_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.crypto_path),
            media_types: env_list("MEDIA_TYPES", "image"),
            plugins: env_list("PLUGINS", "basic_auth"),
            password_extra_salt: env_opt("PASSWORD_EXTRA_SALT"),
            bcrypt_cost,
            fp_token_max_age_secs,
            mail,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.database_url.is_empty() {
            anyhow::bail!("DATABASE_URL must not be empty");
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            anyhow::bail!("BCRYPT_COST must be between 4 and 31, got {}", self.bcrypt_cost);
        }
        if !self.mail.sender_address.contains('@') {
            anyhow::bail!(
                "EMAIL_SENDER_ADDRESS is not an email address: {}",
                self.mail.sender_address
            );
        }
        if self.is_production() {
            if self.mail.tests_enabled {
                anyhow::bail!("TESTS_ENABLED cannot be set in production");
            }
            if !self.mail.debug_mode && self.mail.smtp_host.trim().is_empty() {
                tracing::warn!("EMAIL_SMTP_HOST is empty, mail will be sent through localhost");
            }
        }
        Ok(())
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.db_timeout_seconds
    }

    pub fn plugin_enabled(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mail_defaults_fall_back_to_localhost_and_port_25() {
        let mail = MailConfig::default();
        assert_eq!(mail.effective_host(), "localhost");
        assert_eq!(mail.effective_port(), 25);
        assert!(!mail.wants_login());
    }

    #[test]
    fn mail_login_when_only_password_set() {
        let mail = MailConfig {
            smtp_pass: Some("secret".to_string()),
            ..MailConfig::default()
        };
        assert!(mail.wants_login());
    }

    #[test]
    fn validate_rejects_bad_bcrypt_cost() {
        let config = Config {
            database_url: "postgres://localhost/galleon".to_string(),
            bcrypt_cost: 2,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_test_capture_in_production() {
        let mut config = Config {
            database_url: "postgres://localhost/galleon".to_string(),
            environment: "production".to_string(),
            ..Config::default()
        };
        config.mail.tests_enabled = true;
        assert!(config.is_production());
        assert!(config.validate().is_err());
    }

    #[test]
    fn plugin_enabled_checks_list() {
        let config = Config::default();
        assert!(config.plugin_enabled("basic_auth"));
        assert!(!config.plugin_enabled("openid"));
    }
}
