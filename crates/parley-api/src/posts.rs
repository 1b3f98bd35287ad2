use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use parley_types::api::CreatePostRequest;
use parley_types::models::{Actor, CommentableKind, LikeableKind, Post};

use crate::comments::parse_id;
use crate::error::ApiError;
use crate::extract::Payload;
use crate::state::{AppState, blocking};

pub async fn create_post(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Payload(req): Payload<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(ApiError::validation("title", "The title field is required."));
    }

    let post = Post {
        id: Uuid::new_v4(),
        author_id: actor.id,
        kind: req.kind.unwrap_or(CommentableKind::Post),
        title: title.to_string(),
        body: req.body,
        likers_count: 0,
        comments_count: 0,
        liked: false,
        created_at: Utc::now(),
    };

    let post = blocking(&state, move |s| {
        s.db.insert_post(&post)?;
        Ok(post)
    })
    .await?;

    info!("{} created {} {}", actor.username, post.kind, post.id);
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(viewer): Extension<Actor>,
) -> Result<Json<Post>, ApiError> {
    let id = parse_id("post", &id)?;

    let post = blocking(&state, move |s| {
        let mut post = s.db.get_post(id)?.ok_or_else(|| ApiError::not_found("post", id))?;
        post.liked = s
            .db
            .get_liked_by(viewer.id, LikeableKind::Post, &[post.id])?
            .contains(&post.id);
        Ok(post)
    })
    .await?;

    Ok(Json(post))
}
