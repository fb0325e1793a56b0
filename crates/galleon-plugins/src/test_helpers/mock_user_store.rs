//! Mock user store for testing without database

use async_trait::async_trait;
use chrono::Utc;
use galleon_core::models::User;
use galleon_core::AppError;
use galleon_db::{NewUser, UserStore};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// Mock user store keyed by user id
#[derive(Clone, Default)]
pub struct MockUserStore {
    users: Arc<Mutex<BTreeMap<i64, User>>>,
    next_id: Arc<AtomicI64>,
}

impl MockUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unverified account directly, bypassing hashing
    pub fn insert_user(&self, username: &str, email: &str, pw_hash: Option<&str>) -> User {
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            username: username.to_string(),
            email: email.to_string(),
            pw_hash: pw_hash.map(str::to_string),
            email_verified: false,
            bio: None,
            url: None,
            created_at: Utc::now(),
        };
        self.users.lock().unwrap().insert(user.id, user.clone());
        user
    }

    pub fn set_email_verified(&self, id: i64, verified: bool) {
        if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
            user.email_verified = verified;
        }
    }

    pub fn user(&self, id: i64) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl UserStore for MockUserStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.user(id))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_by_username_or_email(&self, login: &str) -> Result<Option<User>, AppError> {
        let users = self.users.lock().unwrap();
        let by_username = users.values().find(|u| u.username == login);
        Ok(by_username
            .or_else(|| users.values().find(|u| u.email == login))
            .cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        if self.get_by_username(&new_user.username).await?.is_some() {
            return Err(AppError::InvalidInput(format!(
                "Username '{}' is taken",
                new_user.username
            )));
        }
        Ok(self.insert_user(
            &new_user.username,
            &new_user.email,
            new_user.pw_hash.as_deref(),
        ))
    }

    async fn update_pw_hash(&self, id: i64, pw_hash: &str) -> Result<(), AppError> {
        match self.users.lock().unwrap().get_mut(&id) {
            Some(user) => {
                user.pw_hash = Some(pw_hash.to_string());
                Ok(())
            }
            None => Err(AppError::NotFound(format!("User {} not found", id))),
        }
    }

    async fn mark_email_verified(&self, id: i64) -> Result<(), AppError> {
        match self.users.lock().unwrap().get_mut(&id) {
            Some(user) => {
                user.email_verified = true;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("User {} not found", id))),
        }
    }
}
