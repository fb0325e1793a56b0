use async_trait::async_trait;
use galleon_core::{generate_slug, models::MediaEntry, AppError, SlugLookup};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};

const ENTRY_COLUMNS: &str = "id, uploader, title, slug, description, media_type, state, license, \
     media_files, media_data, fail_error, fail_metadata, created_at";

/// Repository for media entries
#[derive(Clone)]
pub struct MediaEntryRepository {
    pool: PgPool,
}

impl MediaEntryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Whether `uploader` already has another entry with this slug
    #[tracing::instrument(skip(self), fields(db.table = "media_entries", db.operation = "select"))]
    pub async fn check_media_slug_used(
        &self,
        uploader: i64,
        slug: &str,
        ignore_id: Option<i64>,
    ) -> Result<bool, AppError> {
        let used = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM media_entries \
             WHERE uploader = $1 AND slug = $2 AND id IS DISTINCT FROM $3)",
        )
        .bind(uploader)
        .bind(slug)
        .bind(ignore_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(used)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_entries", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: i64) -> Result<Option<MediaEntry>, AppError> {
        let entry = sqlx::query_as::<Postgres, MediaEntry>(&format!(
            "SELECT {} FROM media_entries WHERE id = $1",
            ENTRY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media_entries", db.operation = "select"))]
    pub async fn get_by_slug(&self, uploader: i64, slug: &str) -> Result<Option<MediaEntry>, AppError> {
        let entry = sqlx::query_as::<Postgres, MediaEntry>(&format!(
            "SELECT {} FROM media_entries WHERE uploader = $1 AND slug = $2",
            ENTRY_COLUMNS
        ))
        .bind(uploader)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Assign a unique slug and persist the entry, inserting it when it has no id yet.
    #[tracing::instrument(skip(self, entry), fields(db.table = "media_entries", db.operation = "upsert", db.record_id = ?entry.id))]
    pub async fn save(&self, entry: &mut MediaEntry) -> Result<(), AppError> {
        generate_slug(entry, self).await?;

        let saved = match entry.id {
            None => {
                sqlx::query_as::<Postgres, MediaEntry>(&format!(
                    "INSERT INTO media_entries \
                     (uploader, title, slug, description, media_type, state, license, \
                      media_files, media_data, fail_error, fail_metadata) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
                     RETURNING {}",
                    ENTRY_COLUMNS
                ))
                .bind(entry.uploader)
                .bind(&entry.title)
                .bind(&entry.slug)
                .bind(&entry.description)
                .bind(&entry.media_type)
                .bind(entry.state)
                .bind(&entry.license)
                .bind(Json(&entry.media_files))
                .bind(&entry.media_data)
                .bind(&entry.fail_error)
                .bind(&entry.fail_metadata)
                .fetch_one(&self.pool)
                .await?
            }
            Some(id) => sqlx::query_as::<Postgres, MediaEntry>(&format!(
                "UPDATE media_entries SET title = $2, slug = $3, description = $4, \
                 media_type = $5, state = $6, license = $7, media_files = $8, \
                 media_data = $9, fail_error = $10, fail_metadata = $11 \
                 WHERE id = $1 RETURNING {}",
                ENTRY_COLUMNS
            ))
            .bind(id)
            .bind(&entry.title)
            .bind(&entry.slug)
            .bind(&entry.description)
            .bind(&entry.media_type)
            .bind(entry.state)
            .bind(&entry.license)
            .bind(Json(&entry.media_files))
            .bind(&entry.media_data)
            .bind(&entry.fail_error)
            .bind(&entry.fail_metadata)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Media entry {} not found", id)))?,
        };

        *entry = saved;
        Ok(())
    }
}

#[async_trait]
impl SlugLookup for MediaEntryRepository {
    async fn slug_used(
        &self,
        owner_id: i64,
        slug: &str,
        ignore_id: Option<i64>,
    ) -> Result<bool, AppError> {
        self.check_media_slug_used(owner_id, slug, ignore_id).await
    }
}
