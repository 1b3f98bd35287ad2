use thiserror::Error;

use crate::gate::Action;

pub type Result<T> = std::result::Result<T, CommentError>;

/// Every rejection is deterministic; none of these should be retried.
#[derive(Error, Debug)]
pub enum CommentError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("not allowed to {action}")]
    Unauthorized { action: Action },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl CommentError {
    pub fn not_found<T: ToString>(entity: &'static str, id: T) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation<T: ToString>(field: &'static str, message: T) -> Self {
        Self::Validation {
            field,
            message: message.to_string(),
        }
    }
}
