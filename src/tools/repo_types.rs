use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RiceCalculation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub feature_name: String,
    pub reach: f64,
    pub impact: f64,
    pub confidence: f64,
    pub effort: f64,
    pub score: f64,
    pub created_at: OffsetDateTime,
}

/// A story as persisted, with its templated rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedStory {
    pub story: String,
    pub category: String,
    pub priority: String,
    pub formatted_story: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserStoryRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_name: Option<String>,
    pub stories: Vec<FormattedStory>,
    pub created_at: OffsetDateTime,
}
