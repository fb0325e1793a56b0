use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::markdown::cleaned_markdown_conversion;

/// A comment left on a media entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MediaComment {
    pub id: i64,
    pub media_entry: i64,
    pub author: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl MediaComment {
    pub fn content_html(&self) -> String {
        cleaned_markdown_conversion(Some(&self.content))
    }

    /// Display form naming the author, once the caller has resolved the username
    pub fn display_with_author(&self, author_username: &str) -> String {
        format_comment(self.id, &author_username, &self.content)
    }
}

fn format_comment(id: i64, author: &dyn fmt::Display, content: &str) -> String {
    format!("<MediaComment #{} {} \"{}\">", id, author, content)
}

/// Shows the author's id; use [`MediaComment::display_with_author`] for the username.
impl fmt::Display for MediaComment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_comment(self.id, &self.author, &self.content))
    }
}
