use time::OffsetDateTime;
use tracing::{info, warn};

use crate::auth::password::{hash_password_async, verify_password_async};
use crate::auth::repo::UserStore;
use crate::auth::repo_types::{NewUser, User};
use crate::db::StoreError;
use crate::error::{AppError, AppResult, CredentialFailure};
use crate::progress::repo::ProgressStore;
use crate::state::AppState;

/// Create a learner, seed their progress record and sign them in.
///
/// Returns the issued token and the user with `last_login` set.
pub async fn register(
    state: &AppState,
    email: String,
    password: String,
    name: String,
) -> AppResult<(String, User)> {
    // Fast path; the unique constraint in the store closes the race.
    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }

    let password_hash = hash_password_async(password).await?;

    let user = state
        .users
        .create(NewUser {
            email,
            password_hash,
            name,
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) => {
                warn!("email registered concurrently");
                AppError::DuplicateEmail
            }
            other => other.into(),
        })?;

    state.progress.get_or_create(user.id).await?;
    let token = state.keys.issue_default(user.id)?;
    let user = state
        .users
        .touch_last_login(user.id, OffsetDateTime::now_utc())
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((token, user))
}

/// Check an email/password pair and record the login.
///
/// Unknown email and wrong password produce the same error.
pub async fn authenticate(users: &dyn UserStore, email: &str, password: &str) -> AppResult<User> {
    let Some(user) = users.find_by_email(email).await? else {
        return Err(AppError::InvalidCredentials(CredentialFailure::UnknownEmail));
    };

    if !verify_password_async(password.to_string(), user.password_hash.clone()).await? {
        return Err(AppError::InvalidCredentials(CredentialFailure::WrongPassword));
    }

    let user = users
        .touch_last_login(user.id, OffsetDateTime::now_utc())
        .await?;
    info!(user_id = %user.id, "user logged in");
    Ok(user)
}
