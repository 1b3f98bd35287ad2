pub mod comments;
pub mod error;
pub mod extract;
pub mod fragments;
pub mod likes;
pub mod middleware;
pub mod posts;
pub mod presenter;
pub mod profile;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::{AppState, AppStateInner};
