use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, MessageResponse, PublicUser, RegisterRequest},
        extractors::AuthUser,
        services,
    },
    error::AppResult,
    state::AppState,
    validation::ValidJson,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (token, user) =
        services::register(&state, payload.email, payload.password, payload.name).await?;
    Ok(Json(AuthResponse::bearer(token, &user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = services::authenticate(state.users.as_ref(), &payload.email, &payload.password)
        .await?;
    let token = state.keys.issue_default(user.id)?;
    Ok(Json(AuthResponse::bearer(token, &user)))
}

/// Tokens are stateless; the client discards its copy.
#[instrument(skip_all)]
pub async fn logout(AuthUser(user): AuthUser) -> Json<MessageResponse> {
    tracing::info!(user_id = %user.id, "user logged out");
    Json(MessageResponse {
        message: "Successfully logged out".into(),
    })
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(PublicUser::from(&user))
}
