use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use parley_core::CommentEvent;
use parley_types::api::{CreateCommentRequest, MessageRequest, StreamResponse};
use parley_types::events::GatewayEvent;
use parley_types::models::{Actor, CommentThread, CommentableKind, CommentableRef};

use crate::error::ApiError;
use crate::extract::Payload;
use crate::presenter;
use crate::state::{AppState, AppStateInner, blocking};

pub async fn list_comments(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Extension(viewer): Extension<Actor>,
) -> Result<Json<CommentThread>, ApiError> {
    let kind: CommentableKind = kind.parse().map_err(|_| ApiError::not_found("commentable", &kind))?;
    let target = CommentableRef::new(kind, parse_id(kind.as_str(), &id)?);

    let thread = blocking(&state, move |s| Ok(s.threads.list_for_entity(&viewer, &target)?)).await?;
    Ok(Json(thread))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Payload(req): Payload<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = match req.commentable_type.as_deref() {
        None => CommentableKind::Post,
        Some(raw) => raw
            .parse::<CommentableKind>()
            .map_err(|e| ApiError::validation("commentable_type", e))?,
    };
    if req.commentable_id.trim().is_empty() {
        return Err(ApiError::validation(
            "commentable_id",
            "The commentable id field is required.",
        ));
    }
    // An id that cannot exist still goes through the store lookup, so a bad
    // message is reported before the missing target.
    let id = req.commentable_id.trim().parse().unwrap_or_default();
    let target = CommentableRef::new(kind, id);
    let message = req.message.unwrap_or_default();

    let event = blocking(&state, move |s| Ok(s.threads.create(&actor, &target, &message)?)).await?;
    Ok((StatusCode::CREATED, publish(&state, &event)?))
}

pub async fn reply_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StreamResponse>, ApiError> {
    let id = parse_id("comment", &id)?;
    let comment = blocking(&state, move |s| Ok(s.threads.find_comment(id)?)).await?;
    Ok(Json(StreamResponse {
        directives: presenter::reply_form(&state.fragments, &comment)?,
    }))
}

pub async fn reply_to_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(actor): Extension<Actor>,
    Payload(req): Payload<MessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let parent_id = parse_id("comment", &id)?;
    let message = req.message.unwrap_or_default();

    let event = blocking(&state, move |s| Ok(s.threads.reply(&actor, parent_id, &message)?)).await?;
    Ok((StatusCode::CREATED, publish(&state, &event)?))
}

pub async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StreamResponse>, ApiError> {
    let id = parse_id("comment", &id)?;
    let comment = blocking(&state, move |s| Ok(s.threads.find_comment(id)?)).await?;
    Ok(Json(StreamResponse {
        directives: presenter::edit_form(&state.fragments, &comment)?,
    }))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(actor): Extension<Actor>,
    Payload(req): Payload<MessageRequest>,
) -> Result<Json<StreamResponse>, ApiError> {
    let id = parse_id("comment", &id)?;
    let message = req.message.unwrap_or_default();

    let event = blocking(&state, move |s| Ok(s.threads.update(&actor, id, &message)?)).await?;
    publish(&state, &event)
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<StreamResponse>, ApiError> {
    let id = parse_id("comment", &id)?;

    let event = blocking(&state, move |s| Ok(s.threads.delete(&actor, id)?)).await?;
    publish(&state, &event)
}

/// Render the event, fan it out to subscribers of the commentable and answer
/// the caller with the same directives.
fn publish(state: &AppStateInner, event: &CommentEvent) -> Result<Json<StreamResponse>, ApiError> {
    let directives = presenter::directives(&state.fragments, event)?;
    state.dispatcher.broadcast(GatewayEvent::Stream {
        topic: event.topic(),
        directives: directives.clone(),
    });
    Ok(Json(StreamResponse { directives }))
}

pub(crate) fn parse_id(entity: &'static str, raw: &str) -> Result<Uuid, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found(entity, raw))
}
