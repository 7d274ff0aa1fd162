//! In-process store used for `STORE_BACKEND=memory` and by the test-suite.
//!
//! Each collection sits behind its own mutex; no lock is held across an await.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, Role, User};
use crate::db::StoreError;
use crate::progress::repo::ProgressStore;
use crate::progress::repo_types::{AssessmentScore, ProgressRecord, SectionUpdate};
use crate::tools::repo::ToolStore;
use crate::tools::repo_types::{RiceCalculation, UserStoryRecord};

#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<Mutex<HashMap<Uuid, User>>>,
    progress: Arc<Mutex<HashMap<Uuid, ProgressRecord>>>,
    // insertion order doubles as creation order
    rice: Arc<Mutex<Vec<RiceCalculation>>>,
    stories: Arc<Mutex<Vec<UserStoryRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn take_limit(limit: i64) -> usize {
    usize::try_from(limit).unwrap_or(0)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(lock(&self.users).values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(lock(&self.users).get(&id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = lock(&self.users);
        if users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            password_hash: new_user.password_hash,
            name: new_user.name,
            role: Role::Learner,
            created_at: now,
            updated_at: now,
            last_login: None,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn touch_last_login(&self, id: Uuid, at: OffsetDateTime) -> Result<User, StoreError> {
        let mut users = lock(&self.users);
        let user = users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.last_login = Some(at);
        user.updated_at = at;
        Ok(user.clone())
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get_or_create(&self, user_id: Uuid) -> Result<ProgressRecord, StoreError> {
        let mut progress = lock(&self.progress);
        let record = progress
            .entry(user_id)
            .or_insert_with(|| ProgressRecord::new_default(user_id, OffsetDateTime::now_utc()));
        Ok(record.clone())
    }

    async fn update_section(
        &self,
        user_id: Uuid,
        update: &SectionUpdate,
    ) -> Result<ProgressRecord, StoreError> {
        let now = OffsetDateTime::now_utc();
        let mut progress = lock(&self.progress);
        let record = progress
            .entry(user_id)
            .or_insert_with(|| ProgressRecord::new_default(user_id, now));
        record.apply_section_update(update, now);
        Ok(record.clone())
    }

    async fn submit_assessment(
        &self,
        user_id: Uuid,
        score: AssessmentScore,
    ) -> Result<ProgressRecord, StoreError> {
        let now = OffsetDateTime::now_utc();
        let mut progress = lock(&self.progress);
        let record = progress
            .entry(user_id)
            .or_insert_with(|| ProgressRecord::new_default(user_id, now));
        record.push_assessment(score, now);
        Ok(record.clone())
    }
}

#[async_trait]
impl ToolStore for MemoryStore {
    async fn insert_rice(&self, calc: &RiceCalculation) -> Result<(), StoreError> {
        lock(&self.rice).push(calc.clone());
        Ok(())
    }

    async fn list_rice(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RiceCalculation>, StoreError> {
        Ok(lock(&self.rice)
            .iter()
            .rev()
            .filter(|c| c.user_id == user_id)
            .take(take_limit(limit))
            .cloned()
            .collect())
    }

    async fn delete_rice(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let mut rice = lock(&self.rice);
        let before = rice.len();
        rice.retain(|c| !(c.id == id && c.user_id == user_id));
        Ok(rice.len() < before)
    }

    async fn insert_user_stories(&self, record: &UserStoryRecord) -> Result<(), StoreError> {
        lock(&self.stories).push(record.clone());
        Ok(())
    }

    async fn list_user_stories(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<UserStoryRecord>, StoreError> {
        Ok(lock(&self.stories)
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .take(take_limit(limit))
            .cloned()
            .collect())
    }
}
