use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use ripple_types::api::{ConfirmResponse, RegisterRequest, RegisterResponse, TokenResponse};
use ripple_types::models::Actor;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::middleware::require_user;
use crate::state::{AppState, run_db};

pub(crate) fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.len() < 3 || username.len() > 64 {
        return Err(ApiError::BadRequest("username must be 3-64 characters".into()));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
    {
        return Err(ApiError::BadRequest(
            "username may only contain letters, numbers, dots or underscores".into(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.len() > 64 || !email.contains('@') {
        return Err(ApiError::BadRequest("invalid email address".into()));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_email(&req.email)?;
    validate_username(&req.username)?;
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest("password must be at least 8 characters".into()));
    }

    let admin_email = state.settings.admin_email.clone();
    let user = run_db(&state, move |db| {
        db.create_user(&req.email, &req.username, &req.password, admin_email.as_deref())
    })
    .await?;

    let token = state.tokens.generate_confirmation_token(user.id)?;
    state.mailer.send_confirmation(&user, &token);
    info!("Registered user {} ({})", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            confirmed: user.confirmed,
        }),
    ))
}

pub async fn confirm(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(token): Path<String>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    let user = require_user(&actor)?;
    if user.confirmed {
        return Ok(Json(ConfirmResponse { confirmed: true }));
    }

    let id = user.id;
    let shared = state.clone();
    let confirmed = run_db(&state, move |db| db.confirm(&shared.tokens, &token, id)).await?;
    if !confirmed {
        return Err(ApiError::BadRequest("confirmation link is invalid or has expired".into()));
    }
    Ok(Json(ConfirmResponse { confirmed }))
}

pub async fn resend_confirmation(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, ApiError> {
    let user = require_user(&actor)?;
    if user.confirmed {
        return Ok((StatusCode::OK, Json(ConfirmResponse { confirmed: true })));
    }

    let token = state.tokens.generate_confirmation_token(user.id)?;
    state.mailer.send_confirmation(user, &token);
    Ok((StatusCode::ACCEPTED, Json(ConfirmResponse { confirmed: false })))
}

/// Exchange password credentials for an auth token. A token cannot be used
/// to mint another one.
pub async fn get_token(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = match &actor {
        Actor::Authenticated {
            user,
            via_token: false,
        } => user,
        Actor::Authenticated { user, .. } => {
            warn!("User {} tried to refresh a token with a token", user.id);
            return Err(ApiError::Unauthorized);
        }
        Actor::Anonymous => return Err(ApiError::Unauthorized),
    };

    let token = state.tokens.generate_auth_token(user.id)?;
    Ok(Json(TokenResponse {
        token,
        expiration: state.tokens.auth_ttl_secs(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("alice_01.b").is_ok());
        assert!(validate_username("al").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(65)).is_err());
    }

    #[test]
    fn emails() {
        assert!(validate_email("a@example.com").is_ok());
        assert!(validate_email("nope").is_err());
    }
}
