use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use crate::tools::repo_types::{FormattedStory, RiceCalculation, UserStoryRecord};

#[derive(Debug, Deserialize, Validate)]
pub struct RiceRequest {
    #[validate(length(min = 1, message = "feature_name is required"))]
    pub feature_name: String,
    #[validate(range(min = 0.0, message = "reach must be >= 0"))]
    pub reach: f64,
    #[validate(range(min = 0.0, max = 10.0, message = "impact must be between 0 and 10"))]
    pub impact: f64,
    #[validate(range(min = 0.0, max = 100.0, message = "confidence must be between 0 and 100"))]
    pub confidence: f64,
    #[validate(range(exclusive_min = 0.0, message = "effort must be > 0"))]
    pub effort: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RiceResponse {
    pub id: Uuid,
    pub feature_name: String,
    pub reach: f64,
    pub impact: f64,
    pub confidence: f64,
    pub effort: f64,
    pub score: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<RiceCalculation> for RiceResponse {
    fn from(c: RiceCalculation) -> Self {
        Self {
            id: c.id,
            feature_name: c.feature_name,
            reach: c.reach,
            impact: c.impact,
            confidence: c.confidence,
            effort: c.effort,
            score: c.score,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StoryInput {
    pub story: String,
    pub category: String,
    pub priority: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserStoryRequest {
    pub project_name: Option<String>,
    pub stories: Vec<StoryInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserStorySaved {
    pub message: String,
    pub id: Uuid,
    pub story_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserStoryView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_name: Option<String>,
    pub stories: Vec<FormattedStory>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<UserStoryRecord> for UserStoryView {
    fn from(r: UserStoryRecord) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            project_name: r.project_name,
            stories: r.stories,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserStoriesResponse {
    pub user_stories: Vec<UserStoryView>,
}
