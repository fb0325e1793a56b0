//! Outbound services shared by plugins and the API.

pub mod mail;

pub use mail::{CapturedEmail, MailCapture, MailError, Mailer};
