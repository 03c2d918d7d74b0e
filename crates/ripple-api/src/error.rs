use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{Json, http::StatusCode, response::IntoResponse};
use ripple_db::DbError;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    /// Missing, malformed, expired or wrong credentials. Deliberately one
    /// message for every cause.
    #[error("invalid credentials")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("internal server error")]
    Internal,
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => ApiError::NotFound(what),
            DbError::Conflict(detail) => ApiError::Conflict(conflict_message(&detail)),
            other => {
                error!("Database error: {}", other);
                ApiError::Internal
            }
        }
    }
}

impl From<ripple_auth::AuthError> for ApiError {
    fn from(err: ripple_auth::AuthError) -> Self {
        error!("Auth error: {}", err);
        ApiError::Internal
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// SQLite reports e.g. "UNIQUE constraint failed: users.email"; keep the
/// column, drop the engine wording.
fn conflict_message(detail: &str) -> String {
    if detail.contains("users.email") {
        "email already registered".into()
    } else if detail.contains("users.username") {
        "username already in use".into()
    } else {
        "conflicting record".into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violations_map_to_friendly_conflicts() {
        let conflict = |msg: &str| ApiError::from(DbError::Conflict(msg.into()));
        let err = conflict("UNIQUE constraint failed: users.email");
        assert_eq!(err.to_string(), "email already registered");
        let err = conflict("UNIQUE constraint failed: users.username");
        assert_eq!(err.to_string(), "username already in use");
    }

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::NotFound("post").into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Unauthorized.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("no").into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(DbError::LockPoisoned).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
