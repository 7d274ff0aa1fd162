use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    auth::extractors::AuthUser,
    error::AppResult,
    progress::{
        dto::{
            AssessmentRequest, AssessmentResponse, ProgressResponse, SectionUpdateRequest,
            SectionUpdateResponse,
        },
        repo::ProgressStore,
        repo_types::{AssessmentScore, SectionUpdate},
    },
    state::AppState,
    validation::ValidJson,
};

pub fn progress_routes() -> Router<AppState> {
    Router::new()
        .route("/progress", get(get_progress))
        .route("/progress/section", post(update_section))
        .route("/progress/assessment", post(submit_assessment))
}

#[instrument(skip_all)]
pub async fn get_progress(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<ProgressResponse>> {
    let record = state.progress.get_or_create(user.id).await?;
    Ok(Json(record.into()))
}

#[instrument(skip_all)]
pub async fn update_section(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(payload): ValidJson<SectionUpdateRequest>,
) -> AppResult<Json<SectionUpdateResponse>> {
    let update = SectionUpdate::from(payload);
    let record = state.progress.update_section(user.id, &update).await?;
    info!(
        user_id = %user.id,
        section_id = %update.section_id,
        module_id = %update.module_id,
        completed = update.completed,
        total_progress = record.total_progress,
        "section progress updated"
    );
    Ok(Json(SectionUpdateResponse {
        message: "Progress updated successfully".into(),
        total_progress: record.total_progress,
    }))
}

#[instrument(skip_all)]
pub async fn submit_assessment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(payload): ValidJson<AssessmentRequest>,
) -> AppResult<Json<AssessmentResponse>> {
    let score = payload.score;
    let entry = AssessmentScore {
        assessment_id: payload.assessment_id,
        score,
        answers: payload.answers,
        completed_at: OffsetDateTime::now_utc(),
    };
    let assessment_id = entry.assessment_id.clone();
    state.progress.submit_assessment(user.id, entry).await?;
    info!(user_id = %user.id, %assessment_id, score, "assessment submitted");
    Ok(Json(AssessmentResponse {
        message: "Assessment submitted successfully".into(),
        score,
    }))
}
