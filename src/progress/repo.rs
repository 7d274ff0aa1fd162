use async_trait::async_trait;
use sqlx::{types::Json, FromRow, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{PgStore, StoreError};
use crate::progress::repo_types::{AssessmentScore, ModuleMap, ProgressRecord, SectionUpdate};

/// Progress store contract. Every method creates the default record first if
/// the user has none.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Idempotent: an existing record is returned untouched.
    async fn get_or_create(&self, user_id: Uuid) -> Result<ProgressRecord, StoreError>;

    /// Apply a section toggle, recompute the total and persist the record.
    async fn update_section(
        &self,
        user_id: Uuid,
        update: &SectionUpdate,
    ) -> Result<ProgressRecord, StoreError>;

    /// Append an assessment result; the total is not recomputed.
    async fn submit_assessment(
        &self,
        user_id: Uuid,
        score: AssessmentScore,
    ) -> Result<ProgressRecord, StoreError>;
}

#[derive(Debug, FromRow)]
struct ProgressRow {
    user_id: Uuid,
    completed_sections: Json<Vec<String>>,
    module_progress: Json<ModuleMap>,
    assessment_scores: Json<Vec<AssessmentScore>>,
    total_progress: f64,
    last_accessed_module: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ProgressRow> for ProgressRecord {
    fn from(row: ProgressRow) -> Self {
        let mut record = ProgressRecord {
            user_id: row.user_id,
            completed_sections: row.completed_sections.0,
            module_progress: row.module_progress.0,
            assessment_scores: row.assessment_scores.0,
            total_progress: row.total_progress,
            last_accessed_module: row.last_accessed_module,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };
        record.ensure_all_modules();
        record
    }
}

const PROGRESS_COLUMNS: &str = "user_id, completed_sections, module_progress, assessment_scores, \
     total_progress, last_accessed_module, created_at, updated_at";

/// Insert the default record unless one exists. Safe under concurrent callers.
async fn insert_default_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> Result<(), StoreError> {
    let record = ProgressRecord::new_default(user_id, OffsetDateTime::now_utc());
    sqlx::query(
        r#"
        INSERT INTO user_progress
            (user_id, completed_sections, module_progress, assessment_scores,
             total_progress, last_accessed_module, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(record.user_id)
    .bind(Json(&record.completed_sections))
    .bind(Json(&record.module_progress))
    .bind(Json(&record.assessment_scores))
    .bind(record.total_progress)
    .bind(&record.last_accessed_module)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn get_or_create(&self, user_id: Uuid) -> Result<ProgressRecord, StoreError> {
        let mut tx = self.pool.begin().await?;
        insert_default_tx(&mut tx, user_id).await?;
        let row = sqlx::query_as::<_, ProgressRow>(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row.into())
    }

    async fn update_section(
        &self,
        user_id: Uuid,
        update: &SectionUpdate,
    ) -> Result<ProgressRecord, StoreError> {
        let mut tx = self.pool.begin().await?;
        insert_default_tx(&mut tx, user_id).await?;

        // Row lock serialises concurrent toggles from the same user.
        let row = sqlx::query_as::<_, ProgressRow>(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut record = ProgressRecord::from(row);
        record.apply_section_update(update, OffsetDateTime::now_utc());

        sqlx::query(
            r#"
            UPDATE user_progress
               SET completed_sections = $2,
                   module_progress = $3,
                   total_progress = $4,
                   last_accessed_module = $5,
                   updated_at = $6
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(Json(&record.completed_sections))
        .bind(Json(&record.module_progress))
        .bind(record.total_progress)
        .bind(&record.last_accessed_module)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn submit_assessment(
        &self,
        user_id: Uuid,
        score: AssessmentScore,
    ) -> Result<ProgressRecord, StoreError> {
        let mut tx = self.pool.begin().await?;
        insert_default_tx(&mut tx, user_id).await?;
        let row = sqlx::query_as::<_, ProgressRow>(&format!(
            r#"
            UPDATE user_progress
               SET assessment_scores = assessment_scores || jsonb_build_array($2::jsonb),
                   updated_at = $3
             WHERE user_id = $1
            RETURNING {PROGRESS_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(Json(&score))
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row.into())
    }
}
