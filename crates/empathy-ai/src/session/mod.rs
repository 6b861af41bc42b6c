//! Conversation session management.
//!
//! A `Session` holds the display log (turns) and the raw token context the
//! model has seen, and runs one user turn at a time through the model.

mod chat;
mod manager;
mod types;
mod window;


pub use manager::Session;
pub use types::{OverflowPolicy, SessionOptions, SessionState, SharedSession};
