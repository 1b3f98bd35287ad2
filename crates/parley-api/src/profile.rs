use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};

use parley_types::api::{CommentPage, CommentPageQuery, HistoryCursor};
use parley_types::models::Actor;

use crate::comments::parse_id;
use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// A user's comment history, newest first.
///
/// Pass `next_cursor` from the previous page as `before` to fetch older
/// comments.
pub async fn user_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CommentPageQuery>,
    Extension(viewer): Extension<Actor>,
) -> Result<Json<CommentPage>, ApiError> {
    let user_id = parse_id("user", &id)?;
    let before = query
        .before
        .as_deref()
        .map(|raw| {
            raw.parse::<HistoryCursor>()
                .map_err(|_| ApiError::validation("before", "The before field must be a cursor returned by a previous page."))
        })
        .transpose()?;
    let limit = query.limit;

    let (comments, next) = blocking(&state, move |s| {
        if s.db.get_user_by_id(user_id)?.is_none() {
            return Err(ApiError::not_found("user", user_id));
        }
        Ok(s.threads.comments_by(&viewer, user_id, before, limit)?)
    })
    .await?;

    Ok(Json(CommentPage {
        comments,
        next_cursor: next.map(|cursor| cursor.to_string()),
    }))
}
