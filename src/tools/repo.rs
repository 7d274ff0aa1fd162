use async_trait::async_trait;
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{PgStore, StoreError};
use crate::tools::repo_types::{FormattedStory, RiceCalculation, UserStoryRecord};

/// History of calculator results. Every read and delete is scoped by owner.
#[async_trait]
pub trait ToolStore: Send + Sync {
    async fn insert_rice(&self, calc: &RiceCalculation) -> Result<(), StoreError>;

    /// Newest first, at most `limit` rows.
    async fn list_rice(&self, user_id: Uuid, limit: i64)
        -> Result<Vec<RiceCalculation>, StoreError>;

    /// Delete only when both id and owner match. Returns whether a row went away.
    async fn delete_rice(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError>;

    async fn insert_user_stories(&self, record: &UserStoryRecord) -> Result<(), StoreError>;

    /// Newest first, at most `limit` rows.
    async fn list_user_stories(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<UserStoryRecord>, StoreError>;
}

#[derive(Debug, FromRow)]
struct UserStoryRow {
    id: Uuid,
    user_id: Uuid,
    project_name: Option<String>,
    stories: Json<Vec<FormattedStory>>,
    created_at: OffsetDateTime,
}

impl From<UserStoryRow> for UserStoryRecord {
    fn from(row: UserStoryRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            project_name: row.project_name,
            stories: row.stories.0,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl ToolStore for PgStore {
    async fn insert_rice(&self, calc: &RiceCalculation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO rice_calculations
                (id, user_id, feature_name, reach, impact, confidence, effort, score, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(calc.id)
        .bind(calc.user_id)
        .bind(&calc.feature_name)
        .bind(calc.reach)
        .bind(calc.impact)
        .bind(calc.confidence)
        .bind(calc.effort)
        .bind(calc.score)
        .bind(calc.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_rice(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<RiceCalculation>, StoreError> {
        let rows = sqlx::query_as::<_, RiceCalculation>(
            r#"
            SELECT id, user_id, feature_name, reach, impact, confidence, effort, score, created_at
              FROM rice_calculations
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_rice(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM rice_calculations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_user_stories(&self, record: &UserStoryRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO user_stories (id, user_id, project_name, stories, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.project_name)
        .bind(Json(&record.stories))
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_user_stories(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<UserStoryRecord>, StoreError> {
        let rows = sqlx::query_as::<_, UserStoryRow>(
            r#"
            SELECT id, user_id, project_name, stories, created_at
              FROM user_stories
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
