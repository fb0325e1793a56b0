//! Galleon Core Library
//!
//! This crate provides the domain models, error types, configuration and the
//! entity helpers (slugs, rendered Markdown, display URLs, EXIF summaries)
//! shared by every Galleon component.

pub mod config;
pub mod crypto;
pub mod error;
pub mod exif;
pub mod licenses;
pub mod markdown;
pub mod media;
pub mod models;
pub mod slug;
pub mod urlgen;

// Re-export commonly used types
pub use config::{Config, MailConfig};
pub use crypto::{load_or_create_key, SignatureError, TimedSigner};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use markdown::cleaned_markdown_conversion;
pub use media::{MediaManager, MediaManagerRegistry, MediaTypeError, ProcessingFailure};
pub use slug::{generate_slug, slugify, SlugLookup, Sluggable};
pub use urlgen::{LocalPublicStore, PublicStore, StaticDirector, UrlGenerator};
