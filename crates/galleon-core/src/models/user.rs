use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::markdown::cleaned_markdown_conversion;

/// Registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Absent for accounts managed by an external auth provider
    #[serde(skip_serializing, default)]
    pub pw_hash: Option<String>,
    pub email_verified: bool,
    pub bio: Option<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Rendered, sanitised profile text
    pub fn bio_html(&self) -> String {
        cleaned_markdown_conversion(self.bio.as_deref())
    }
}

/// Account registration input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegistrationForm {
    #[validate(length(min = 3, max = 30, message = "Username must be between 3 and 30 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Absent when the account is created through an external provider
    #[validate(length(min = 5, max = 1024, message = "Password must be at least 5 characters"))]
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(bio: Option<&str>) -> User {
        User {
            id: 1,
            username: "chris".to_string(),
            email: "chris@example.org".to_string(),
            pw_hash: Some("$2b$12$hash".to_string()),
            email_verified: true,
            bio: bio.map(str::to_string),
            url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn bio_html_renders_markdown() {
        assert!(user(Some("I *like* cats")).bio_html().contains("<em>like</em>"));
        assert_eq!(user(None).bio_html(), "");
    }

    #[test]
    fn pw_hash_never_serialized() {
        let json = serde_json::to_value(user(None)).unwrap();
        assert!(json.get("pw_hash").is_none());
        assert_eq!(json["username"], "chris");
    }

    #[test]
    fn registration_form_validation() {
        let form = RegistrationForm {
            username: "chris".to_string(),
            email: "not-an-email".to_string(),
            password: Some("secret123".to_string()),
        };
        assert!(form.validate().is_err());

        let form = RegistrationForm {
            username: "chris".to_string(),
            email: "chris@example.org".to_string(),
            password: None,
        };
        assert!(form.validate().is_ok());
    }
}
