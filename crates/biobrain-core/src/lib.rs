//! Conversation state, bounded history and the chat turn logic.
//!
//! Pure Rust: every browser facility is reached through the traits in
//! [`ports`].

pub mod ports;
pub mod event_bus;
pub mod session;
pub mod store;
pub mod saved;
pub mod credentials;
pub mod prompts;
pub mod runtime;

#[cfg(test)]
mod tests;
