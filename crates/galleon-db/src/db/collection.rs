use async_trait::async_trait;
use galleon_core::{
    generate_slug,
    models::{Collection, CollectionItem},
    AppError, SlugLookup,
};
use sqlx::{PgPool, Postgres};

const COLLECTION_COLUMNS: &str = "id, creator, title, slug, description, items, created_at";

/// Repository for collections and their items
#[derive(Clone)]
pub struct CollectionRepository {
    pool: PgPool,
}

impl CollectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Whether `creator` already has another collection with this slug
    #[tracing::instrument(skip(self), fields(db.table = "collections", db.operation = "select"))]
    pub async fn check_collection_slug_used(
        &self,
        creator: i64,
        slug: &str,
        ignore_id: Option<i64>,
    ) -> Result<bool, AppError> {
        let used = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM collections \
             WHERE creator = $1 AND slug = $2 AND id IS DISTINCT FROM $3)",
        )
        .bind(creator)
        .bind(slug)
        .bind(ignore_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(used)
    }

    #[tracing::instrument(skip(self), fields(db.table = "collections", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: i64) -> Result<Option<Collection>, AppError> {
        let collection = sqlx::query_as::<Postgres, Collection>(&format!(
            "SELECT {} FROM collections WHERE id = $1",
            COLLECTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(collection)
    }

    /// Assign a unique slug and persist the collection, inserting it when it has no id yet.
    #[tracing::instrument(skip(self, collection), fields(db.table = "collections", db.operation = "upsert", db.record_id = ?collection.id))]
    pub async fn save(&self, collection: &mut Collection) -> Result<(), AppError> {
        generate_slug(collection, self).await?;

        let saved = match collection.id {
            None => {
                sqlx::query_as::<Postgres, Collection>(&format!(
                    "INSERT INTO collections (creator, title, slug, description) \
                     VALUES ($1, $2, $3, $4) RETURNING {}",
                    COLLECTION_COLUMNS
                ))
                .bind(collection.creator)
                .bind(&collection.title)
                .bind(&collection.slug)
                .bind(&collection.description)
                .fetch_one(&self.pool)
                .await?
            }
            Some(id) => sqlx::query_as::<Postgres, Collection>(&format!(
                "UPDATE collections SET title = $2, slug = $3, description = $4 \
                 WHERE id = $1 RETURNING {}",
                COLLECTION_COLUMNS
            ))
            .bind(id)
            .bind(&collection.title)
            .bind(&collection.slug)
            .bind(&collection.description)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Collection {} not found", id)))?,
        };

        *collection = saved;
        Ok(())
    }

    /// Add a media entry to a collection and bump its item count.
    #[tracing::instrument(skip(self, note), fields(db.table = "collection_items", db.operation = "insert"))]
    pub async fn add_item(
        &self,
        collection_id: i64,
        media_entry_id: i64,
        note: Option<String>,
    ) -> Result<CollectionItem, AppError> {
        let mut tx = self.pool.begin().await?;

        let item = sqlx::query_as::<Postgres, CollectionItem>(
            r#"
            INSERT INTO collection_items (media_entry, collection, note, position)
            VALUES ($1, $2, $3,
                    (SELECT COALESCE(MAX(position), 0) + 1 FROM collection_items WHERE collection = $2))
            RETURNING id, media_entry, collection, note, position, added_at
            "#,
        )
        .bind(media_entry_id)
        .bind(collection_id)
        .bind(&note)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE collections SET items = items + 1 WHERE id = $1")
            .bind(collection_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(item)
    }

    #[tracing::instrument(skip(self), fields(db.table = "collection_items", db.operation = "select"))]
    pub async fn list_items(&self, collection_id: i64) -> Result<Vec<CollectionItem>, AppError> {
        let items = sqlx::query_as::<Postgres, CollectionItem>(
            "SELECT id, media_entry, collection, note, position, added_at \
             FROM collection_items WHERE collection = $1 ORDER BY position ASC, added_at ASC",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

#[async_trait]
impl SlugLookup for CollectionRepository {
    async fn slug_used(
        &self,
        owner_id: i64,
        slug: &str,
        ignore_id: Option<i64>,
    ) -> Result<bool, AppError> {
        self.check_collection_slug_used(owner_id, slug, ignore_id).await
    }
}
