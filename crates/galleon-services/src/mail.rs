//! Email sending wrapper.
//!
//! Three delivery modes, picked from `MailConfig`:
//! - tests enabled: messages are recorded in a [`MailCapture`] handle
//! - debug mode: messages are logged
//! - otherwise: messages go out over SMTP
//!
//! In the first two modes no SMTP connection is ever opened.

use std::sync::{Arc, Mutex, MutexGuard};

use galleon_core::{AppError, MailConfig};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("no recipients")]
    NoRecipients,
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        AppError::Mail(err.to_string())
    }
}

/// A message recorded instead of being delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    /// The full formatted message, headers included
    pub raw: String,
}

/// Shared inbox for messages sent while tests are enabled.
///
/// Clones share the same inbox.
#[derive(Debug, Clone, Default)]
pub struct MailCapture {
    inbox: Arc<Mutex<Vec<CapturedEmail>>>,
}

impl MailCapture {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CapturedEmail>> {
        self.inbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, email: CapturedEmail) {
        self.lock().push(email);
    }

    /// Snapshot of everything captured so far
    pub fn messages(&self) -> Vec<CapturedEmail> {
        self.lock().clone()
    }

    /// Drain the inbox
    pub fn take(&self) -> Vec<CapturedEmail> {
        std::mem::take(&mut *self.lock())
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[derive(Clone)]
enum Delivery {
    Capture(MailCapture),
    Debug,
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
}

/// Sends plain-text email according to the mail configuration.
#[derive(Clone)]
pub struct Mailer {
    delivery: Delivery,
    /// Log messages as well as capturing them
    debug: bool,
    sender_address: String,
}

impl Mailer {
    /// Build a mailer from configuration.
    ///
    /// Only constructs the SMTP transport; no connection is made until a
    /// message is sent.
    pub fn from_config(config: &MailConfig) -> Result<Self, MailError> {
        Self::with_capture(config, MailCapture::new())
    }

    /// Like [`Mailer::from_config`], recording into `capture` when tests are enabled.
    pub fn with_capture(config: &MailConfig, capture: MailCapture) -> Result<Self, MailError> {
        let delivery = if config.tests_enabled {
            tracing::info!("Mail capture enabled, messages will not be delivered");
            Delivery::Capture(capture)
        } else if config.debug_mode {
            tracing::info!("Mail debug mode enabled, messages will be logged only");
            Delivery::Debug
        } else {
            Delivery::Smtp(build_transport(config)?)
        };

        Ok(Self {
            delivery,
            debug: config.debug_mode,
            sender_address: config.sender_address.clone(),
        })
    }

    /// Configured `From:` address
    pub fn sender_address(&self) -> &str {
        &self.sender_address
    }

    /// Capture inbox, when tests are enabled
    pub fn capture(&self) -> Option<&MailCapture> {
        match &self.delivery {
            Delivery::Capture(capture) => Some(capture),
            _ => None,
        }
    }

    /// Send a `text/plain; charset=utf-8` message to every address in `to`.
    #[tracing::instrument(skip(self, body), fields(recipients = to.len()))]
    pub async fn send_email(
        &self,
        from: &str,
        to: &[String],
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        if to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(parse_mailbox(from)?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for address in to {
            builder = builder.to(parse_mailbox(address)?);
        }
        let message = builder.body(body.to_string())?;

        if let Delivery::Capture(capture) = &self.delivery {
            capture.push(CapturedEmail {
                from: from.to_string(),
                to: to.to_vec(),
                subject: subject.to_string(),
                body: body.to_string(),
                raw: String::from_utf8_lossy(&message.formatted()).into_owned(),
            });
        }

        if self.debug {
            tracing::info!(
                from = %from,
                to = %to.join(", "),
                subject = %subject,
                body = %body,
                "===== Email ====="
            );
        }

        match &self.delivery {
            Delivery::Smtp(transport) => {
                transport.send(message).await?;
                tracing::info!(count = to.len(), "Email sent");
            }
            Delivery::Capture(_) | Delivery::Debug => {}
        }
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

fn build_transport(config: &MailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let host = config.effective_host();
    let port = config.effective_port();

    let builder = if config.smtp_starttls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?.port(port)
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host).port(port)
    };
    let builder = if config.wants_login() {
        builder.credentials(Credentials::new(
            config.smtp_user.clone().unwrap_or_default(),
            config.smtp_pass.clone().unwrap_or_default(),
        ))
    } else {
        builder
    };

    tracing::info!(
        host = %host,
        port = port,
        starttls = config.smtp_starttls,
        "Mail transport initialized (SMTP)"
    );
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture_config() -> MailConfig {
        MailConfig {
            tests_enabled: true,
            debug_mode: false,
            ..MailConfig::default()
        }
    }

    #[tokio::test]
    async fn test_mode_captures_message() {
        let capture = MailCapture::new();
        let mailer = Mailer::with_capture(&capture_config(), capture.clone()).unwrap();

        mailer
            .send_email(
                "notice@galleon.example.org",
                &["chris@example.org".to_string(), "sam@example.org".to_string()],
                "Hello",
                "Welcome aboard",
            )
            .await
            .unwrap();

        let messages = capture.take();
        assert_eq!(messages.len(), 1);
        let email = &messages[0];
        assert_eq!(email.from, "notice@galleon.example.org");
        assert_eq!(email.to, vec!["chris@example.org", "sam@example.org"]);
        assert_eq!(email.subject, "Hello");
        assert_eq!(email.body, "Welcome aboard");
        assert!(email.raw.contains("Subject: Hello"));
        assert!(email.raw.contains("text/plain; charset=utf-8"));
        assert!(capture.is_empty());
    }

    #[tokio::test]
    async fn debug_mode_sends_nothing() {
        let mailer = Mailer::from_config(&MailConfig::default()).unwrap();
        assert!(mailer.capture().is_none());
        mailer
            .send_email("a@example.org", &["b@example.org".to_string()], "Hi", "Body")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn invalid_recipient_is_rejected() {
        let mailer = Mailer::from_config(&capture_config()).unwrap();
        let err = mailer
            .send_email("a@example.org", &["not an address".to_string()], "Hi", "Body")
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::InvalidAddress { .. }));
        assert_eq!(mailer.capture().map(MailCapture::len), Some(0));
    }

    #[tokio::test]
    async fn empty_recipient_list_is_rejected() {
        let mailer = Mailer::from_config(&capture_config()).unwrap();
        assert!(matches!(
            mailer.send_email("a@example.org", &[], "Hi", "Body").await,
            Err(MailError::NoRecipients)
        ));
    }

    #[tokio::test]
    async fn smtp_transport_builds_without_connecting() {
        let config = MailConfig {
            debug_mode: false,
            smtp_host: String::new(),
            smtp_port: 0,
            smtp_user: Some("mailer".to_string()),
            smtp_pass: Some("secret".to_string()),
            ..MailConfig::default()
        };
        let mailer = Mailer::from_config(&config).unwrap();
        assert!(mailer.capture().is_none());
        assert_eq!(mailer.sender_address(), "notice@galleon.example.org");
    }

    #[test]
    fn mail_error_maps_to_app_error() {
        let err: AppError = MailError::NoRecipients.into();
        assert!(matches!(err, AppError::Mail(_)));
    }
}
