use axum::{
    Form, Json,
    extract::{FromRequest, Request},
    http::header,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Request body accepted either as JSON or as a urlencoded form post, so the
/// rendered comment forms can submit directly.
///
/// Unknown fields are ignored. A body that cannot be read at all is reported
/// as a validation error against the offending field.
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|rejection| malformed(rejection.body_text()))?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state)
                .await
                .map_err(|rejection| malformed(rejection.body_text()))?;
            Ok(Self(value))
        }
    }
}

fn malformed(detail: String) -> ApiError {
    match offending_field(&detail) {
        Some(field) => ApiError::Malformed {
            message: format!("The {} field is invalid.", field),
            field: field.to_string(),
        },
        None => ApiError::Malformed {
            field: "body".into(),
            message: detail,
        },
    }
}

/// Deserializer errors read "<context>: <path>: <reason>" when a field is
/// to blame, e.g. "...target type: message: invalid type: integer `5`".
fn offending_field(detail: &str) -> Option<&str> {
    let (_, rest) = detail.split_once(": ")?;
    let (path, _) = rest.split_once(": ")?;
    let is_path = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    is_path.then_some(path)
}
