//! Unified error type for handlers.
//!
//! Every failure a handler can produce ends up as an [`AppError`], which renders
//! as `{"error": ..., "detail": ...}` with a stable status code. Authentication
//! failures with several causes (bad password vs. unknown email, bad signature
//! vs. deleted user) collapse into one variant each; the cause is logged only.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use validator::ValidationErrors;

use crate::auth::jwt::TokenFailure;
use crate::auth::password::PasswordError;
use crate::db::StoreError;

pub type AppResult<T> = Result<T, AppError>;

/// Why a login attempt was refused. Logged, never sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFailure {
    UnknownEmail,
    WrongPassword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("invalid credentials ({0:?})")]
    InvalidCredentials(CredentialFailure),

    #[error("missing or malformed authorization header")]
    MissingCredential,

    #[error("invalid token ({0})")]
    InvalidToken(TokenFailure),

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Error body returned to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::DuplicateEmail => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidCredentials(_)
            | AppError::MissingCredential
            | AppError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let (error, detail) = match self {
            AppError::BadRequest(detail) => ("Invalid input".to_string(), Some(detail.clone())),
            AppError::Validation(fields) => {
                let detail = fields
                    .iter()
                    .map(|f| format!("{}: {}", f.field, f.message))
                    .collect::<Vec<_>>()
                    .join("; ");
                ("Validation failed".to_string(), Some(detail))
            }
            AppError::DuplicateEmail => ("Email already registered".to_string(), None),
            AppError::InvalidCredentials(_) => ("Incorrect email or password".to_string(), None),
            AppError::MissingCredential => {
                ("Missing or invalid authorization header".to_string(), None)
            }
            AppError::InvalidToken(_) => ("Could not validate credentials".to_string(), None),
            AppError::NotFound(what) => (format!("{what} not found"), None),
            AppError::Internal(detail) => {
                ("Internal server error".to_string(), Some(detail.clone()))
            }
        };
        ErrorBody { error, detail }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Internal(detail) => error!(detail = %detail, "internal error"),
            AppError::InvalidCredentials(cause) => warn!(?cause, "credentials rejected"),
            AppError::InvalidToken(cause) => warn!(%cause, "token rejected"),
            _ => {}
        }

        let status = self.status();
        let mut response = (status, Json(self.body())).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| FieldError {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(fields)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(format!("password operation failed: {err}"))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{err:#}"))
    }
}
