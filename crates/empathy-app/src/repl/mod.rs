//! Interactive terminal chat: line input, slash commands, and rendering.

mod commands;
mod core;
mod render;
mod spinner;

#[cfg(test)]
mod tests;

pub use self::core::ChatApp;
pub use render::header as render_header;
pub use spinner::Spinner;
