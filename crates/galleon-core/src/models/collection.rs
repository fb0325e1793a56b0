use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::markdown::cleaned_markdown_conversion;
use crate::models::MediaEntry;
use crate::slug::Sluggable;
use crate::urlgen::{UrlGenerator, COLLECTION_MEDIA_HOME, USER_COLLECTION};

/// A user-curated group of media entries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Collection {
    /// Unset until persisted
    pub id: Option<i64>,
    pub creator: i64,
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub items: i32,
    pub created_at: DateTime<Utc>,
}

impl Collection {
    pub fn new(creator: i64, title: impl Into<String>) -> Self {
        Self {
            id: None,
            creator,
            title: title.into(),
            slug: None,
            description: None,
            items: 0,
            created_at: Utc::now(),
        }
    }

    pub fn description_html(&self) -> String {
        cleaned_markdown_conversion(self.description.as_deref())
    }

    /// The slug if there is one, else the bare id
    pub fn slug_or_id(&self) -> String {
        match self.slug.as_deref() {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => self.id.unwrap_or_default().to_string(),
        }
    }

    pub fn url_for_self(
        &self,
        urlgen: &UrlGenerator,
        creator_username: &str,
        extra: &[(&str, &str)],
    ) -> Result<String, AppError> {
        let collection = self.slug_or_id();
        let mut params: Vec<(&str, &str)> =
            vec![("user", creator_username), ("collection", &collection)];
        params.extend_from_slice(extra);
        urlgen.url_for(USER_COLLECTION, &params, false)
    }
}

impl Sluggable for Collection {
    fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    fn set_slug(&mut self, slug: Option<String>) {
        self.slug = slug;
    }

    fn title(&self) -> Option<&str> {
        Some(self.title.as_str())
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn owner_id(&self) -> i64 {
        self.creator
    }
}

/// Membership of a media entry in a collection, with an optional note
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CollectionItem {
    pub id: i64,
    pub media_entry: i64,
    pub collection: i64,
    pub note: Option<String>,
    pub position: Option<i32>,
    pub added_at: DateTime<Utc>,
}

impl CollectionItem {
    pub fn note_html(&self) -> String {
        cleaned_markdown_conversion(self.note.as_deref())
    }

    /// Link to the item's media page within its collection.
    ///
    /// The collection segment is the collection's title, not its slug.
    pub fn url_for_self(
        &self,
        urlgen: &UrlGenerator,
        entry: &MediaEntry,
        uploader_username: &str,
        collection: &Collection,
        creator_username: &str,
        extra: &[(&str, &str)],
    ) -> Result<String, AppError> {
        let media = entry.slug_or_id();
        let mut params: Vec<(&str, &str)> = vec![
            ("user", uploader_username),
            ("media", &media),
            ("creator", creator_username),
            ("collection", collection.title.as_str()),
        ];
        params.extend_from_slice(extra);
        urlgen.url_for(COLLECTION_MEDIA_HOME, &params, false)
    }
}
