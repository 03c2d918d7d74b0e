use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::middleware::{require_confirmed, resolve_actor};
use crate::state::AppState;
use crate::{auth, comments, posts, users};

/// Every HTTP route. `/auth` stays reachable for unconfirmed accounts; the
/// rest requires a confirmed user or an anonymous caller.
pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/confirm", post(auth::resend_confirmation))
        .route("/auth/confirm/{token}", get(auth::confirm));

    let app_routes = Router::new()
        .route("/token", get(auth::get_token))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/{id}", get(posts::get_post).put(posts::edit_post))
        .route(
            "/posts/{id}/comments",
            get(comments::post_comments).post(comments::create_comment),
        )
        .route("/comments", get(comments::list_comments))
        .route(
            "/comments/{id}",
            get(comments::get_comment).delete(comments::delete_comment),
        )
        .route("/comments/{id}/disable", put(comments::disable_comment))
        .route("/comments/{id}/enable", put(comments::enable_comment))
        .route("/me", put(users::edit_profile))
        .route(
            "/admin/users/{id}",
            put(users::admin_edit_profile).delete(users::delete_user),
        )
        .route("/users/{username}", get(users::profile))
        .route("/users/{username}/posts", get(posts::user_posts))
        .route("/users/{username}/feed", get(posts::user_feed))
        .route(
            "/users/{username}/follow",
            post(users::follow).delete(users::unfollow),
        )
        .route("/users/{username}/followers", get(users::followers))
        .route("/users/{username}/following", get(users::following))
        .route_layer(middleware::from_fn(require_confirmed));

    Router::new()
        .merge(auth_routes)
        .merge(app_routes)
        .layer(middleware::from_fn_with_state(state.clone(), resolve_actor))
        .with_state(state)
}
