//! Types shared by every EmpathyBot crate: error enums and identifiers.

pub mod errors;
pub mod id;

pub use errors::{ConfigError, EmpathyError};
pub use id::SessionId;

pub type Result<T> = std::result::Result<T, EmpathyError>;
