use async_trait::async_trait;
use galleon_core::{models::User, AppError};
use sqlx::{PgPool, Postgres};

const USER_COLUMNS: &str =
    "id, username, email, pw_hash, email_verified, bio, url, created_at";

/// Insert payload for a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub pw_hash: Option<String>,
}

/// User persistence used by authentication plugins
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Account whose username or email equals `login`
    async fn get_by_username_or_email(&self, login: &str) -> Result<Option<User>, AppError>;

    async fn create(&self, new_user: NewUser) -> Result<User, AppError>;

    async fn update_pw_hash(&self, id: i64, pw_hash: &str) -> Result<(), AppError>;

    async fn mark_email_verified(&self, id: i64) -> Result<(), AppError>;
}

/// Repository for user accounts
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn get_by_username_or_email(&self, login: &str) -> Result<Option<User>, AppError> {
        // Usernames win over emails when both match different rows
        let user = sqlx::query_as::<Postgres, User>(&format!(
            "SELECT {} FROM users WHERE username = $1 OR email = $1 \
             ORDER BY (username = $1) DESC LIMIT 1",
            USER_COLUMNS
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self, new_user), fields(db.table = "users", db.operation = "insert", username = %new_user.username))]
    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            "INSERT INTO users (username, email, pw_hash) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.pw_hash)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = user.id, "User created");
        Ok(user)
    }

    #[tracing::instrument(skip(self, pw_hash), fields(db.table = "users", db.operation = "update", db.record_id = %id))]
    async fn update_pw_hash(&self, id: i64, pw_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET pw_hash = $1 WHERE id = $2")
            .bind(pw_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "update", db.record_id = %id))]
    async fn mark_email_verified(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET email_verified = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }
}
