use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use crate::comments;
use crate::likes;
use crate::middleware::require_auth;
use crate::posts;
use crate::profile;
use crate::state::AppState;

/// Every authenticated route of the comment API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/commentables/{kind}/{id}/comments", get(comments::list_comments))
        .route("/comments", post(comments::create_comment))
        .route(
            "/comments/{id}/reply",
            get(comments::reply_form).post(comments::reply_to_comment),
        )
        .route("/comments/{id}/edit", get(comments::edit_form))
        .route(
            "/comments/{id}",
            patch(comments::update_comment)
                .post(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route("/likes/{kind}/{id}", post(likes::toggle_like))
        .route("/posts", post(posts::create_post))
        .route("/posts/{id}", get(posts::get_post))
        .route("/users/{id}/comments", get(profile::user_comments))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}
