use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::config::AppEnv;

/// Application error taxonomy. Handlers return `Result<_, AppError>` and
/// propagate with `?`; this type is the single channel every failure flows
/// through before being shaped into a response.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.into())
    }
}

/// Uniform error body: `{ message, stack }`. The stack field carries
/// diagnostic detail in development and a fixed placeholder in production.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

fn operating_env() -> AppEnv {
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => AppEnv::Production,
        _ => AppEnv::Development,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, error = %self, "request failed");
        }
        let stack = if operating_env().is_production() {
            Some(":)".to_string())
        } else {
            Some(format!("{self:?}"))
        };
        let body = ErrorBody {
            message: self.to_string(),
            stack,
        };
        (status, Json(body)).into_response()
    }
}

/// Fallback for unmatched routes; synthesizes a 404 that flows through the
/// same translator as every other failure.
pub async fn not_found_fallback(uri: axum::http::Uri) -> AppError {
    AppError::not_found(format!("Not Found - {uri}"))
}

/// Path ids arrive as strings so a malformed identifier maps to 404 rather
/// than the framework's default 400, matching the named-entity lookups.
pub fn parse_id(raw: &str, entity: &str) -> Result<uuid::Uuid, AppError> {
    raw.parse::<uuid::Uuid>()
        .map_err(|_| AppError::not_found(format!("{entity} not found.")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(
            AppError::validation("dup").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::auth("bad").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("no").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("gone").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn malformed_id_maps_to_not_found() {
        let err = parse_id("not-a-uuid", "Issue").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Issue not found.");

        let id = uuid::Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "Issue").unwrap(), id);
    }

    #[test]
    fn error_body_serializes_message() {
        let body = ErrorBody {
            message: "User not found.".into(),
            stack: Some(":)".into()),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("User not found."));
        assert!(json.contains("stack"));
    }
}
