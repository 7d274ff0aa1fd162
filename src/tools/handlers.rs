use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{dto::MessageResponse, extractors::AuthUser},
    error::{AppError, AppResult, FieldError},
    state::AppState,
    tools::{
        calc::{format_story, rice_score},
        dto::{
            RiceRequest, RiceResponse, UserStoriesResponse, UserStoryRequest, UserStorySaved,
        },
        repo::ToolStore,
        repo_types::{FormattedStory, RiceCalculation, UserStoryRecord},
    },
    validation::ValidJson,
};

pub const RICE_HISTORY_LIMIT: i64 = 50;
pub const USER_STORY_LIMIT: i64 = 20;

pub fn tools_routes() -> Router<AppState> {
    Router::new()
        .route("/tools/rice-calculation", post(save_rice_calculation))
        .route("/tools/rice-calculation/:id", delete(delete_rice_calculation))
        .route("/tools/rice-history", get(rice_history))
        .route("/tools/user-story", post(save_user_stories))
        .route("/tools/user-stories", get(list_user_stories))
}

#[instrument(skip_all)]
pub async fn save_rice_calculation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(body): ValidJson<RiceRequest>,
) -> AppResult<Json<RiceResponse>> {
    let score = rice_score(body.reach, body.impact, body.confidence, body.effort);
    if !score.is_finite() {
        return Err(AppError::Validation(vec![FieldError {
            field: "score".into(),
            message: "score must be a finite number".into(),
        }]));
    }

    let calc = RiceCalculation {
        id: Uuid::new_v4(),
        user_id: user.id,
        score,
        feature_name: body.feature_name,
        reach: body.reach,
        impact: body.impact,
        confidence: body.confidence,
        effort: body.effort,
        created_at: OffsetDateTime::now_utc(),
    };
    state.tools.insert_rice(&calc).await?;
    info!(user_id = %user.id, calc_id = %calc.id, score = calc.score, "rice calculation saved");
    Ok(Json(calc.into()))
}

#[instrument(skip_all)]
pub async fn rice_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<RiceResponse>>> {
    let rows = state.tools.list_rice(user.id, RICE_HISTORY_LIMIT).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[instrument(skip_all)]
pub async fn delete_rice_calculation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::BadRequest("Invalid calculation ID".into()))?;

    if !state.tools.delete_rice(user.id, id).await? {
        warn!(user_id = %user.id, calc_id = %id, "rice calculation not found or not owned");
        return Err(AppError::NotFound("Calculation"));
    }

    info!(user_id = %user.id, calc_id = %id, "rice calculation deleted");
    Ok(Json(MessageResponse {
        message: "Calculation deleted successfully".into(),
    }))
}

#[instrument(skip_all)]
pub async fn save_user_stories(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(body): ValidJson<UserStoryRequest>,
) -> AppResult<Json<UserStorySaved>> {
    let stories: Vec<FormattedStory> = body
        .stories
        .into_iter()
        .map(|s| FormattedStory {
            formatted_story: format_story(&s.story),
            story: s.story,
            category: s.category,
            priority: s.priority,
        })
        .collect();

    let record = UserStoryRecord {
        id: Uuid::new_v4(),
        user_id: user.id,
        project_name: body.project_name,
        stories,
        created_at: OffsetDateTime::now_utc(),
    };
    state.tools.insert_user_stories(&record).await?;

    info!(user_id = %user.id, record_id = %record.id, count = record.stories.len(), "user stories saved");
    Ok(Json(UserStorySaved {
        message: "User stories saved successfully".into(),
        id: record.id,
        story_count: record.stories.len(),
    }))
}

#[instrument(skip_all)]
pub async fn list_user_stories(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<UserStoriesResponse>> {
    let rows = state.tools.list_user_stories(user.id, USER_STORY_LIMIT).await?;
    Ok(Json(UserStoriesResponse {
        user_stories: rows.into_iter().map(Into::into).collect(),
    }))
}
