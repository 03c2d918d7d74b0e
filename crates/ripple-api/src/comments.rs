use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use ripple_types::api::{CommentBodyRequest, ModerationResponse};
use ripple_types::models::{Actor, Comment};
use ripple_types::pagination::{PageQuery, Paginated};
use ripple_types::permissions::Permission;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::middleware::{require_permission, require_user};
use crate::state::{AppState, run_db};

/// Comments under a post, oldest first. `?page=-1` jumps to the last page.
pub async fn post_comments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    WithRejection(Path(post), _): PathParam<Uuid>,
    WithRejection(Query(query), _): QueryParams<PageQuery>,
) -> Result<Json<Paginated<Comment>>, ApiError> {
    let request = state.settings.comments_page(&query);
    let page = run_db(&state, move |db| {
        if db.get_post(post)?.is_none() {
            return Ok(None);
        }
        db.comments_for(post, &actor, request).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("post"))?;
    Ok(Json(page))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    WithRejection(Path(post), _): PathParam<Uuid>,
    WithRejection(Json(req), _): JsonBody<CommentBodyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let author = require_permission(&actor, Permission::Comment)?.id;

    let body = req.body.trim().to_string();
    if body.is_empty() {
        return Err(ApiError::BadRequest("comment body cannot be empty".into()));
    }
    let max = state.settings.max_comment_len;
    if body.chars().count() > max {
        return Err(ApiError::BadRequest(format!("comment exceeds {max} characters")));
    }

    // a missing post fails the foreign key inside the insert
    let comment = run_db(&state, move |db| db.create_comment(post, author, &body))
        .await
        .map_err(|e| match e {
            ApiError::NotFound(_) => ApiError::NotFound("post"),
            other => other,
        })?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    WithRejection(Query(query), _): QueryParams<PageQuery>,
) -> Result<Json<Paginated<Comment>>, ApiError> {
    let request = state.settings.comments_page(&query);
    let page = run_db(&state, move |db| db.all_comments(&actor, request)).await?;
    Ok(Json(page))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<Json<Comment>, ApiError> {
    let comment = run_db(&state, move |db| db.get_comment(id))
        .await?
        .ok_or(ApiError::NotFound("comment"))?;
    if comment.disabled && !actor.is_administrator() {
        return Err(ApiError::Forbidden("comment has been disabled"));
    }
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user = require_user(&actor)?;
    let comment = run_db(&state, move |db| db.get_comment(id))
        .await?
        .ok_or(ApiError::NotFound("comment"))?;
    if comment.author_id != user.id && !user.is_administrator() {
        return Err(ApiError::Forbidden("only the author can delete this comment"));
    }

    run_db(&state, move |db| db.delete_comment(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn moderate(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    disabled: bool,
) -> Result<Json<ModerationResponse>, ApiError> {
    require_permission(actor, Permission::ModerateComments)?;
    let comment = run_db(state, move |db| db.set_comment_disabled(id, disabled)).await?;
    Ok(Json(ModerationResponse {
        id: comment.id,
        disabled: comment.disabled,
    }))
}

pub async fn disable_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<Json<ModerationResponse>, ApiError> {
    moderate(&state, &actor, id, true).await
}

pub async fn enable_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<Json<ModerationResponse>, ApiError> {
    moderate(&state, &actor, id, false).await
}
