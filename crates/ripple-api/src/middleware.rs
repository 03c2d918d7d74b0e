use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{
    Authorization, HeaderMapExt,
    authorization::{Basic, Bearer},
};
use ripple_types::models::{Actor, User};
use ripple_types::permissions::Permission;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::{AppState, run_db};

enum Credentials {
    None,
    Token(String),
    Password { email: String, password: String },
}

/// `Bearer <token>`, `Basic email:password` or `Basic <token>:`. Basic with
/// an empty user part is an explicit anonymous login.
fn credentials(headers: &HeaderMap) -> Result<Credentials, ApiError> {
    if !headers.contains_key(header::AUTHORIZATION) {
        return Ok(Credentials::None);
    }

    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        return Ok(Credentials::Token(bearer.token().to_string()));
    }

    if let Some(Authorization(basic)) = headers.typed_get::<Authorization<Basic>>() {
        return Ok(match (basic.username(), basic.password()) {
            ("", _) => Credentials::None,
            (token, "") => Credentials::Token(token.to_string()),
            (email, password) => Credentials::Password {
                email: email.to_string(),
                password: password.to_string(),
            },
        });
    }

    Err(ApiError::Unauthorized)
}

async fn authenticate(state: &AppState, credentials: Credentials) -> Result<Actor, ApiError> {
    match credentials {
        Credentials::None => Ok(Actor::Anonymous),
        Credentials::Token(token) => {
            let id = state
                .tokens
                .verify_auth_token(&token)
                .ok_or(ApiError::Unauthorized)?;
            // a valid token for a deleted user is just another bad token
            let user = run_db(state, move |db| db.get_user_by_id(id))
                .await?
                .ok_or(ApiError::Unauthorized)?;
            Ok(Actor::Authenticated {
                user,
                via_token: true,
            })
        }
        Credentials::Password { email, password } => {
            let login = email.clone();
            match run_db(state, move |db| db.authenticate(&login, &password)).await? {
                Some(user) => Ok(Actor::Authenticated {
                    user,
                    via_token: false,
                }),
                None => {
                    warn!("Failed login for {}", email);
                    Err(ApiError::Unauthorized)
                }
            }
        }
    }
}

/// Resolve the acting identity and attach it to the request as an
/// `Extension<Actor>`. Authenticated requests refresh `last_seen`.
pub async fn resolve_actor(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credentials = credentials(req.headers())?;
    let actor = authenticate(&state, credentials).await?;

    if let Some(id) = actor.user_id() {
        run_db(&state, move |db| db.ping(id)).await?;
    }

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

/// Authenticated users must confirm their email before using anything
/// outside `/auth`. Must run after `resolve_actor`.
pub async fn require_confirmed(req: Request, next: Next) -> Result<Response, ApiError> {
    if let Some(user) = req.extensions().get::<Actor>().and_then(Actor::user) {
        if !user.confirmed {
            debug!("User {} is not confirmed; refusing {}", user.id, req.uri().path());
            return Err(ApiError::Forbidden("account not confirmed"));
        }
    }
    Ok(next.run(req).await)
}

pub fn require_user(actor: &Actor) -> Result<&User, ApiError> {
    actor.user().ok_or(ApiError::Unauthorized)
}

/// Anonymous actors get 401, authenticated ones lacking the bits get 403.
pub fn require_permission(actor: &Actor, permission: Permission) -> Result<&User, ApiError> {
    let user = require_user(actor)?;
    if user.can(permission) {
        Ok(user)
    } else {
        Err(ApiError::Forbidden("insufficient permissions"))
    }
}
