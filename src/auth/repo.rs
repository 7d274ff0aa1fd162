use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};
use crate::db::{PgStore, StoreError};

/// Credential store contract.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by email (exact match, case-sensitive).
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Insert a new learner. Fails with `StoreError::UniqueViolation` when the
    /// email is already taken; an existing user is never overwritten.
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Set `last_login` (and `updated_at`) and return the updated user.
    async fn touch_last_login(&self, id: Uuid, at: OffsetDateTime) -> Result<User, StoreError>;
}

const USER_COLUMNS: &str =
    "id, email, password_hash, name, role, created_at, updated_at, last_login";

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, name, role)
            VALUES ($1, $2, $3, $4, 'learner')
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.name)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn touch_last_login(&self, id: Uuid, at: OffsetDateTime) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET last_login = $2, updated_at = $2
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}
