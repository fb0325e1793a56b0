//! Media type managers and processing failure kinds.
//!
//! Each enabled media type contributes a [`MediaManager`] describing how its
//! entries are displayed. Requesting a manager for a type that is not enabled
//! is an error rather than a silent fallback.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Media type errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaTypeError {
    #[error("{0}")]
    FileTypeNotSupported(String),
}

/// Display settings contributed by a media type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaManager {
    pub media_type: String,
    pub human_name: String,
    /// Static path of the icon used when an entry has no thumbnail
    pub default_thumb: String,
    /// Preferred media file sizes for display, best first
    pub media_fetch_order: Vec<String>,
}

impl MediaManager {
    pub fn new(
        media_type: impl Into<String>,
        human_name: impl Into<String>,
        default_thumb: impl Into<String>,
        media_fetch_order: &[&str],
    ) -> Self {
        Self {
            media_type: media_type.into(),
            human_name: human_name.into(),
            default_thumb: default_thumb.into(),
            media_fetch_order: media_fetch_order.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Managers for the media types shipped with the application.
    pub fn builtin(media_type: &str) -> Option<Self> {
        let manager = match media_type {
            "image" => Self::new(
                "image",
                "Image",
                "images/media_thumbs/image.png",
                &["medium", "original", "thumb"],
            ),
            "video" => Self::new(
                "video",
                "Video",
                "images/media_thumbs/video.jpg",
                &["webm_video", "original"],
            ),
            "audio" => Self::new(
                "audio",
                "Audio",
                "images/media_thumbs/image.png",
                &["webm_audio", "original"],
            ),
            "ascii" => Self::new(
                "ascii",
                "ASCII",
                "images/media_thumbs/ascii.jpg",
                &["ascii", "original"],
            ),
            "pdf" => Self::new(
                "pdf",
                "PDF",
                "images/media_thumbs/pdf.jpg",
                &["original", "pdf"],
            ),
            _ => return None,
        };
        Some(manager)
    }
}

/// Registry of enabled media types.
#[derive(Debug, Clone, Default)]
pub struct MediaManagerRegistry {
    managers: HashMap<String, MediaManager>,
}

impl MediaManagerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in managers for every name in `enabled`.
    /// Unknown names are skipped with a warning.
    pub fn with_builtin(enabled: &[String]) -> Self {
        let mut registry = Self::new();
        for name in enabled {
            match MediaManager::builtin(name) {
                Some(manager) => registry.register(manager),
                None => tracing::warn!(media_type = %name, "Unknown media type in config, skipping"),
            }
        }
        registry
    }

    pub fn register(&mut self, manager: MediaManager) {
        self.managers.insert(manager.media_type.clone(), manager);
    }

    pub fn get(&self, media_type: &str) -> Result<&MediaManager, MediaTypeError> {
        self.managers.get(media_type).ok_or_else(|| {
            MediaTypeError::FileTypeNotSupported(
                "MediaManager not in enabled types. Check media_type plugins are enabled in config?"
                    .to_string(),
            )
        })
    }

    pub fn contains(&self, media_type: &str) -> bool {
        self.managers.contains_key(media_type)
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

/// Why processing of a media entry failed, resolved from the component path
/// recorded on the entry (e.g. `galleon.processing:BadMediaFail`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingFailure {
    BadMedia,
    FileNotFound,
    PublicStore,
    MissingComponents,
    Unknown(String),
}

impl ProcessingFailure {
    pub fn from_component(component: &str) -> Self {
        let class = component
            .rsplit_once(':')
            .map(|(_, class)| class)
            .unwrap_or(component);
        match class {
            "BadMediaFail" => ProcessingFailure::BadMedia,
            "ProcessFileNotFound" => ProcessingFailure::FileNotFound,
            "PublicStoreFail" => ProcessingFailure::PublicStore,
            "MissingComponents" => ProcessingFailure::MissingComponents,
            _ => ProcessingFailure::Unknown(component.to_string()),
        }
    }

    /// Message suitable for showing to the uploader
    pub fn general_message(&self) -> &str {
        match self {
            ProcessingFailure::BadMedia => "Invalid file given for media type.",
            ProcessingFailure::FileNotFound => "Local file not found.",
            ProcessingFailure::PublicStore => "Copying to public storage failed.",
            ProcessingFailure::MissingComponents => "Required processing components are missing.",
            ProcessingFailure::Unknown(_) => "An unknown error occurred while processing.",
        }
    }
}

impl fmt::Display for ProcessingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.general_message())
    }
}
