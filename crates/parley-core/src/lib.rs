//! Comment thread lifecycle: creation, replies, edits and the soft/hard
//! delete state machine, independent of storage and presentation.

pub mod error;
pub mod events;
pub mod gate;
pub mod memory;
pub mod store;
pub mod thread;

pub use error::{CommentError, Result};
pub use events::CommentEvent;
pub use gate::{Action, AuthorizationGate, CommentPolicy, Subject};
pub use store::EntityStore;
pub use thread::CommentThreads;
