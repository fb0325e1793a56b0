use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::AppError;
use crate::exif;
use crate::licenses::{get_license_by_url, License};
use crate::markdown::cleaned_markdown_conversion;
use crate::media::{MediaManager, MediaManagerRegistry, MediaTypeError, ProcessingFailure};
use crate::slug::Sluggable;
use crate::urlgen::{PublicStore, StaticDirector, UrlGenerator, MEDIA_HOME};

/// Processing state of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "media_state", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum MediaState {
    Unprocessed,
    Processed,
    Failed,
}

/// A piece of uploaded media
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MediaEntry {
    /// Unset until persisted
    pub id: Option<i64>,
    pub uploader: i64,
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub media_type: String,
    pub state: MediaState,
    pub license: Option<String>,
    /// Stored files by size name (`thumb`, `medium`, `original`, ...), each a
    /// list of path segments in the public store
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub media_files: BTreeMap<String, Vec<String>>,
    pub media_data: Option<JsonValue>,
    /// Component path of the processing failure, e.g. `galleon.processing:BadMediaFail`
    pub fail_error: Option<String>,
    pub fail_metadata: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

impl MediaEntry {
    /// Fresh, unsaved entry
    pub fn new(uploader: i64, title: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: None,
            uploader,
            title: title.into(),
            slug: None,
            description: None,
            media_type: media_type.into(),
            state: MediaState::Unprocessed,
            license: None,
            media_files: BTreeMap::new(),
            media_data: None,
            fail_error: None,
            fail_metadata: None,
            created_at: Utc::now(),
        }
    }

    /// Rendered, sanitised description
    pub fn description_html(&self) -> String {
        cleaned_markdown_conversion(self.description.as_deref())
    }

    /// The slug if there is one, else `id:<id>`
    pub fn slug_or_id(&self) -> String {
        match self.slug.as_deref() {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => format!("id:{}", self.id.unwrap_or_default()),
        }
    }

    /// Link to this entry's page, preferring the slug over the id.
    pub fn url_for_self(
        &self,
        urlgen: &UrlGenerator,
        uploader_username: &str,
        extra: &[(&str, &str)],
    ) -> Result<String, AppError> {
        let media = self.slug_or_id();
        let mut params: Vec<(&str, &str)> = vec![("user", uploader_username), ("media", &media)];
        params.extend_from_slice(extra);
        urlgen.url_for(MEDIA_HOME, &params, false)
    }

    /// Manager of this entry's media type
    pub fn media_manager<'a>(
        &self,
        managers: &'a MediaManagerRegistry,
    ) -> Result<&'a MediaManager, MediaTypeError> {
        managers.get(&self.media_type)
    }

    /// The best stored file for display, following the manager's fetch order.
    ///
    /// `None` when the manager declares no order or no listed size is stored.
    pub fn get_display_media(
        &self,
        managers: &MediaManagerRegistry,
    ) -> Result<Option<(&str, &[String])>, MediaTypeError> {
        let manager = self.media_manager(managers)?;
        Ok(manager.media_fetch_order.iter().find_map(|size| {
            self.media_files
                .get_key_value(size.as_str())
                .map(|(size, path)| (size.as_str(), path.as_slice()))
        }))
    }

    /// Thumbnail URL, or the media type's default icon when no thumbnail was stored.
    pub fn thumb_url(
        &self,
        public_store: &dyn PublicStore,
        static_director: &StaticDirector,
        managers: &MediaManagerRegistry,
    ) -> Result<String, MediaTypeError> {
        if let Some(thumb) = self.media_files.get("thumb") {
            return Ok(public_store.file_url(thumb));
        }
        let manager = self.media_manager(managers)?;
        Ok(static_director.url(&manager.default_thumb))
    }

    /// Processing failure recorded on this entry, if any
    pub fn get_fail_exception(&self) -> Option<ProcessingFailure> {
        self.fail_error
            .as_deref()
            .filter(|component| !component.is_empty())
            .map(ProcessingFailure::from_component)
    }

    pub fn get_license_data(&self) -> License {
        get_license_by_url(self.license.as_deref().unwrap_or(""))
    }

    /// All EXIF tags with display labels
    pub fn exif_display_iter(&self) -> Vec<(String, &JsonValue)> {
        exif::display_iter(self.media_data.as_ref())
    }

    /// Short EXIF summary; `None` when the entry has no EXIF data
    pub fn exif_display_data_short(&self) -> Option<Vec<(&'static str, String)>> {
        exif::display_data_short(self.media_data.as_ref())
    }
}

impl Sluggable for MediaEntry {
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
        self.uploader
    }
}
