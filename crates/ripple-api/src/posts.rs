use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use ripple_types::api::{PostBodyRequest, PostDetail};
use ripple_types::models::{Actor, Post};
use ripple_types::pagination::{PageQuery, PageRequest, Paginated};
use ripple_types::permissions::Permission;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::middleware::{require_permission, require_user};
use crate::state::{AppState, run_db};
use crate::users::lookup_user;

fn post_body(body: &str) -> Result<&str, ApiError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ApiError::BadRequest("post body cannot be empty".into()));
    }
    Ok(body)
}

pub async fn list_posts(
    State(state): State<AppState>,
    WithRejection(Query(query), _): QueryParams<PageQuery>,
) -> Result<Json<Paginated<Post>>, ApiError> {
    let request = state.settings.posts_page(&query);
    let page = run_db(&state, move |db| db.all_posts(request)).await?;
    Ok(Json(page))
}

/// A post together with the first page of comments the actor may see.
pub async fn get_post(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    WithRejection(Path(id), _): PathParam<Uuid>,
) -> Result<Json<PostDetail>, ApiError> {
    let request = PageRequest::first(state.settings.comments_per_page);
    let (post, comments) = run_db(&state, move |db| {
        let Some(post) = db.get_post(id)? else {
            return Ok(None);
        };
        let comments = db.comments_for(id, &actor, request)?;
        Ok(Some((post, comments)))
    })
    .await?
    .ok_or(ApiError::NotFound("post"))?;

    Ok(Json(PostDetail {
        post,
        comments_count: comments.total,
        comment_pages: comments.pages,
        comments: comments.items,
    }))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    WithRejection(Json(req), _): JsonBody<PostBodyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let author = require_permission(&actor, Permission::WriteArticles)?.id;
    let body = post_body(&req.body)?.to_string();

    let post = run_db(&state, move |db| db.create_post(author, &body)).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn edit_post(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    WithRejection(Path(id), _): PathParam<Uuid>,
    WithRejection(Json(req), _): JsonBody<PostBodyRequest>,
) -> Result<Json<Post>, ApiError> {
    let user = require_user(&actor)?;
    let body = post_body(&req.body)?.to_string();

    let existing = run_db(&state, move |db| db.get_post(id))
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    if existing.author_id != user.id && !user.is_administrator() {
        return Err(ApiError::Forbidden("only the author can edit this post"));
    }

    let post = run_db(&state, move |db| db.edit_post(id, &body)).await?;
    Ok(Json(post))
}

pub async fn user_posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
    WithRejection(Query(query), _): QueryParams<PageQuery>,
) -> Result<Json<Paginated<Post>>, ApiError> {
    let user = lookup_user(&state, username).await?;
    let request = state.settings.posts_page(&query);
    let page = run_db(&state, move |db| db.posts_by_author(user.id, request)).await?;
    Ok(Json(page))
}

/// Posts from everyone the user follows, their own included.
pub async fn user_feed(
    State(state): State<AppState>,
    Path(username): Path<String>,
    WithRejection(Query(query), _): QueryParams<PageQuery>,
) -> Result<Json<Paginated<Post>>, ApiError> {
    let user = lookup_user(&state, username).await?;
    let request = state.settings.posts_page(&query);
    let page = run_db(&state, move |db| db.feed(user.id, request)).await?;
    Ok(Json(page))
}
