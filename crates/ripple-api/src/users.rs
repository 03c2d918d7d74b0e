use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use ripple_db::{AccountChanges, ProfileChanges};
use ripple_types::api::{
    AdminEditProfileRequest, EditProfileRequest, FollowResponse, UserProfile,
};
use ripple_types::models::{Actor, FollowEntry, User};
use ripple_types::pagination::{PageQuery, Paginated};
use ripple_types::permissions::Permission;
use tracing::info;
use uuid::Uuid;

use crate::auth::{validate_email, validate_username};
use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::middleware::{require_permission, require_user};
use crate::state::{AppState, run_db};

pub(crate) async fn lookup_user(state: &AppState, username: String) -> Result<User, ApiError> {
    run_db(state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::NotFound("user"))
}

/// Attach follow counts and the viewer's relationship to `user`.
async fn profile_of(
    state: &AppState,
    user: User,
    viewer: Option<Uuid>,
) -> Result<UserProfile, ApiError> {
    let id = user.id;
    let (followers, following, followed) = run_db(state, move |db| {
        let (followers, following) = db.follow_counts(id)?;
        let followed = match viewer {
            Some(viewer) if viewer != id => db.is_following(viewer, id)?,
            _ => false,
        };
        Ok((followers, following, followed))
    })
    .await?;
    Ok(UserProfile::new(&user, followers, following, followed))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(username): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = lookup_user(&state, username).await?;
    Ok(Json(profile_of(&state, user, actor.user_id()).await?))
}

pub async fn edit_profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    WithRejection(Json(req), _): JsonBody<EditProfileRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let id = require_user(&actor)?.id;
    let changes = ProfileChanges {
        name: req.name,
        location: req.location,
        about_me: req.about_me,
    };
    let user = run_db(&state, move |db| db.update_profile(id, &changes)).await?;
    Ok(Json(profile_of(&state, user, Some(id)).await?))
}

/// Administrator edit. Omitted fields keep their stored values.
pub async fn admin_edit_profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    WithRejection(Path(id), _): PathParam<Uuid>,
    WithRejection(Json(req), _): JsonBody<AdminEditProfileRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let admin = require_permission(&actor, Permission::Administer)?.id;
    if let Some(email) = &req.email {
        validate_email(email)?;
    }
    if let Some(username) = &req.username {
        validate_username(username)?;
    }

    let changes = AccountChanges {
        email: req.email,
        username: req.username,
        confirmed: req.confirmed,
        role: req.role,
        name: req.name,
        location: req.location,
        about_me: req.about_me,
    };
    let user = run_db(&state, move |db| db.update_account(id, &changes)).await?;

    info!("Administrator {} edited user {}", admin, id);
    Ok(Json(profile_of(&state, user, Some(admin)).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<StatusCode, ApiError> {
    let admin = require_permission(&actor, Permission::Administer)?.id;
    run_db(&state, move |db| db.delete_user(id)).await?;
    info!("Administrator {} deleted user {}", admin, id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn follow(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(username): Path<String>,
) -> Result<Json<FollowResponse>, ApiError> {
    let me = require_permission(&actor, Permission::Follow)?.id;
    let target = lookup_user(&state, username).await?;
    run_db(&state, move |db| db.follow(me, target.id)).await?;
    Ok(Json(FollowResponse { following: true }))
}

pub async fn unfollow(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(username): Path<String>,
) -> Result<Json<FollowResponse>, ApiError> {
    let me = require_permission(&actor, Permission::Follow)?.id;
    let target = lookup_user(&state, username).await?;
    let following = run_db(&state, move |db| {
        db.unfollow(me, target.id)?;
        db.is_following(me, target.id)
    })
    .await?;
    Ok(Json(FollowResponse { following }))
}

pub async fn followers(
    State(state): State<AppState>,
    Path(username): Path<String>,
    WithRejection(Query(query), _): QueryParams<PageQuery>,
) -> Result<Json<Paginated<FollowEntry>>, ApiError> {
    let user = lookup_user(&state, username).await?;
    let request = state.settings.followers_page(&query);
    Ok(Json(run_db(&state, move |db| db.followers(user.id, request)).await?))
}

pub async fn following(
    State(state): State<AppState>,
    Path(username): Path<String>,
    WithRejection(Query(query), _): QueryParams<PageQuery>,
) -> Result<Json<Paginated<FollowEntry>>, ApiError> {
    let user = lookup_user(&state, username).await?;
    let request = state.settings.followers_page(&query);
    Ok(Json(run_db(&state, move |db| db.following(user.id, request)).await?))
}
