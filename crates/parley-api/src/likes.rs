use axum::{
    Extension, Json,
    extract::{Path, State},
};
use tracing::info;

use parley_types::api::LikeResponse;
use parley_types::events::GatewayEvent;
use parley_types::models::{Actor, LikeableKind};

use crate::comments::parse_id;
use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn toggle_like(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<LikeResponse>, ApiError> {
    let kind: LikeableKind = kind.parse().map_err(|_| ApiError::not_found("likeable", &kind))?;
    let likeable_id = parse_id(kind.as_str(), &id)?;

    let user_id = actor.id;
    let (topic, liked, likers_count) = blocking(&state, move |s| {
        let topic = s
            .db
            .likeable_topic(kind, likeable_id)?
            .ok_or_else(|| ApiError::not_found(kind.as_str(), likeable_id))?;
        let (liked, count) = s.db.toggle_like(user_id, kind, likeable_id)?;
        Ok((topic, liked, count))
    })
    .await?;

    info!(
        "{} {} {} {}",
        actor.username,
        if liked { "liked" } else { "unliked" },
        kind.as_str(),
        likeable_id
    );

    state.dispatcher.broadcast(GatewayEvent::LikeUpdate {
        topic,
        likeable_kind: kind,
        likeable_id,
        likers_count,
    });

    Ok(Json(LikeResponse { liked, likers_count }))
}
