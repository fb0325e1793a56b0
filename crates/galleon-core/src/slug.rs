//! Slug derivation and per-owner unique slug resolution.
//!
//! A slug never gets forced onto an entity: without a usable existing slug or
//! title the entity is left without one and callers fall back to its id.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use uuid::Uuid;

use crate::error::AppError;

static PUNCT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r##"[\t !"#$%&'()*\-/<=>?@\[\\\]^_`{|},.]+"##).expect("valid punctuation regex")
});

/// Turn arbitrary text into a lowercase, ASCII, dash-separated slug.
///
/// Returns an empty string when nothing usable remains.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut words: Vec<String> = Vec::new();
    for word in PUNCT_RE.split(&lowered) {
        words.extend(
            deunicode::deunicode(word)
                .split_whitespace()
                .map(str::to_string),
        );
    }
    words.join("-")
}

/// Collision check for slugs, scoped to one owner and one entity kind.
#[async_trait]
pub trait SlugLookup: Send + Sync {
    /// Whether `slug` is already taken by another entity of `owner_id`.
    /// `ignore_id` excludes the entity being slugged.
    async fn slug_used(
        &self,
        owner_id: i64,
        slug: &str,
        ignore_id: Option<i64>,
    ) -> Result<bool, AppError>;
}

/// Entities that carry an owner-scoped slug.
pub trait Sluggable {
    fn slug(&self) -> Option<&str>;
    fn set_slug(&mut self, slug: Option<String>);
    fn title(&self) -> Option<&str>;
    /// Unset until the entity has been persisted
    fn id(&self) -> Option<i64>;
    fn owner_id(&self) -> i64;
}

fn random_hex4() -> String {
    Uuid::new_v4().simple().to_string()[..4].to_string()
}

/// Assign a unique slug to `entity`.
///
/// Resolution order:
/// - the existing slug, sanitised, else the slugified title;
/// - nothing usable: leave the slug unset;
/// - taken: try `{slug}-{id}` when the entity has an id;
/// - still taken: append `-` and four random hex characters, then keep
///   appending four more until the slug is free.
#[tracing::instrument(skip_all, fields(owner_id = entity.owner_id(), entity_id = ?entity.id()))]
pub async fn generate_slug<T>(entity: &mut T, lookup: &dyn SlugLookup) -> Result<(), AppError>
where
    T: Sluggable + Send + ?Sized,
{
    let base = match (entity.slug(), entity.title()) {
        (Some(slug), _) if !slug.is_empty() => slugify(slug),
        (_, Some(title)) if !title.is_empty() => slugify(title),
        _ => String::new(),
    };

    if base.is_empty() {
        entity.set_slug(None);
        return Ok(());
    }

    let owner_id = entity.owner_id();
    let id = entity.id();

    if !lookup.slug_used(owner_id, &base, id).await? {
        entity.set_slug(Some(base));
        return Ok(());
    }

    if let Some(id) = id {
        let slug_with_id = format!("{}-{}", base, id);
        if !lookup.slug_used(owner_id, &slug_with_id, Some(id)).await? {
            entity.set_slug(Some(slug_with_id));
            return Ok(());
        }
    }

    let mut slug = format!("{}-{}", base, random_hex4());
    while lookup.slug_used(owner_id, &slug, id).await? {
        slug.push_str(&random_hex4());
    }
    tracing::debug!(slug = %slug, "Slug collided, using random suffix");
    entity.set_slug(Some(slug));
    Ok(())
}
