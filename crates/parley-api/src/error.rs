use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

use parley_core::CommentError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Comment(#[from] CommentError),

    #[error("unreadable request body: {message}")]
    Malformed { field: String, message: String },

    #[error("missing or invalid bearer token")]
    Unauthenticated,

    #[error("background task failed: {0}")]
    Task(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Comment(CommentError::Store(e))
    }
}

impl ApiError {
    pub fn not_found<T: ToString>(entity: &'static str, id: T) -> Self {
        CommentError::not_found(entity, id).into()
    }

    pub fn validation<T: ToString>(field: &'static str, message: T) -> Self {
        CommentError::validation(field, message).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Comment(CommentError::NotFound { entity, id }) => {
                debug!("{} '{}' not found", entity, id);
                (StatusCode::NOT_FOUND, Json(json!({ "error": format!("{} not found", entity) })))
                    .into_response()
            }
            Self::Comment(CommentError::Validation { field, message }) => unprocessable(field, &message),
            Self::Malformed { field, message } => {
                debug!("Rejected request body: {}", message);
                unprocessable(&field, &message)
            }
            Self::Comment(CommentError::Unauthorized { action }) => (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": format!("not allowed to {}", action) })),
            )
                .into_response(),
            Self::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthenticated" }))).into_response()
            }
            Self::Comment(CommentError::Store(e)) => {
                error!("Store error: {:#}", e);
                internal_error()
            }
            Self::Task(e) => {
                error!("spawn_blocking join error: {}", e);
                internal_error()
            }
        }
    }
}

fn unprocessable(field: &str, message: &str) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "message": message,
            "errors": { field: [message] },
        })),
    )
        .into_response()
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal server error" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body(err: ApiError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_lists_errors_by_field() {
        let (status, json) = body(ApiError::validation("message", "The message field is required.")).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["message"], "The message field is required.");
        assert_eq!(json["errors"]["message"][0], "The message field is required.");
    }

    #[tokio::test]
    async fn store_failures_hide_details() {
        let (status, json) = body(anyhow::anyhow!("disk on fire").into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "internal server error");
    }

    #[tokio::test]
    async fn not_found_names_the_entity() {
        let (status, json) = body(ApiError::not_found("comment", "abc")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "comment not found");
    }
}
