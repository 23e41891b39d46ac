//! Port traits: the hexagonal architecture boundary.
//!
//! These traits are defined here in `biobrain-core` (pure Rust).
//! Implementations live in `biobrain-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use async_trait::async_trait;
use biobrain_types::{Result, message::Message};

// ─── LLM Port ────────────────────────────────────────────────

/// Request to send to an LLM
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Prepended as a `system` message on the wire
    pub system_prompt: Option<String>,
    pub messages: Vec<Message>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Complete (non-streaming) response from an LLM
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[async_trait(?Send)]
pub trait LlmPort {
    /// Send the conversation and wait for the whole answer.
    async fn chat_completion(&self, req: ChatRequest) -> Result<ChatResponse>;
}

// ─── Image Port ──────────────────────────────────────────────

#[async_trait(?Send)]
pub trait ImagePort {
    /// URL of an image generated for `prompt`. The bytes are never fetched
    /// by the core.
    async fn image_url(&self, prompt: &str) -> Result<String>;
}

// ─── Storage Port ────────────────────────────────────────────

/// Key-value text storage (localStorage-shaped).
#[async_trait(?Send)]
pub trait StoragePort {
    /// Get a value by key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; removing a missing key is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}
