use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use parley_types::api::Claims;
use parley_types::models::Actor;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// Extract and validate the JWT from the Authorization header, then hand the
/// resulting [`Actor`] to the handler as an extension.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthenticated)?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        ApiError::Unauthenticated
    })?
    .claims;

    let actor = Actor::from(claims);

    // Comments reference users, so the token's user must exist locally.
    let (id, username) = (actor.id, actor.username.clone());
    if blocking(&state, move |s| Ok(s.db.ensure_user(id, &username)?)).await? {
        debug!("Recorded user {} ({})", actor.username, actor.id);
    }

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}
