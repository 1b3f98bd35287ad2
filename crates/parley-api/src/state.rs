use std::sync::Arc;

use parley_core::{CommentPolicy, CommentThreads};
use parley_db::Database;
use parley_gateway::dispatcher::Dispatcher;

use crate::error::ApiError;
use crate::fragments::Fragments;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub threads: CommentThreads<Arc<Database>, CommentPolicy>,
    pub fragments: Fragments,
    pub dispatcher: Dispatcher,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(db: Database, dispatcher: Dispatcher, jwt_secret: String) -> anyhow::Result<AppState> {
        let db = Arc::new(db);
        Ok(Arc::new(Self {
            threads: CommentThreads::new(db.clone(), CommentPolicy),
            db,
            fragments: Fragments::new()?,
            dispatcher,
            jwt_secret,
        }))
    }
}

/// Run store work off the async runtime.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| ApiError::Task(e.to_string()))?
}
