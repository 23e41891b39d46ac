//! OpenRouter chat client.
//!
//! Two routes to the same API:
//! - `Relay`: POST to the serverless function, which adds the provider key.
//! - `Direct`: POST to OpenRouter with a key supplied by the user.
//! Uses browser `fetch()` via gloo-net for WASM compatibility.

use async_trait::async_trait;
use gloo_net::http::Request;

use biobrain_core::ports::*;
use biobrain_types::{
    ChatError, Result,
    config::{LlmConfig, LlmRoute},
};

use super::wire::{build_request_body, parse_completion, parse_error};

const APP_TITLE: &str = "BioBrain AI";

pub struct OpenRouterProvider {
    config: LlmConfig,
    api_key: String,
}

impl OpenRouterProvider {
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Self {
        Self {
            config,
            api_key: api_key.into(),
        }
    }

    pub fn route(&self) -> LlmRoute {
        self.config.route
    }

    async fn send_relay(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let body = build_request_body(req, false);

        let response = Request::post(&self.config.relay_url)
            .header("Content-Type", "application/json")
            .json(&body)
            .map_err(|e| ChatError::Network(e.to_string()))?
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        if !response.ok() {
            return Err(parse_error(status, &text, "API request failed"));
        }
        parse_completion(&text)
    }

    async fn send_direct(&self, req: &ChatRequest) -> Result<ChatResponse> {
        if self.api_key.trim().is_empty() {
            return Err(ChatError::Config(
                "Please add your API key in Settings".to_string(),
            ));
        }

        let url = format!("{}/v1/chat/completions", self.config.base_url());
        let body = build_request_body(req, true);
        let referer = web_sys::window()
            .and_then(|w| w.location().href().ok())
            .unwrap_or_default();

        let response = Request::post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("HTTP-Referer", &referer)
            .header("X-Title", APP_TITLE)
            .json(&body)
            .map_err(|e| ChatError::Network(e.to_string()))?
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let status = response.status();
        let status_text = response.status_text();
        let text = response
            .text()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        if !response.ok() {
            let fallback = format!("API request failed: {}", status_text);
            return Err(parse_error(status, &text, &fallback));
        }
        parse_completion(&text)
    }
}

#[async_trait(?Send)]
impl LlmPort for OpenRouterProvider {
    async fn chat_completion(&self, req: ChatRequest) -> Result<ChatResponse> {
        let response = match self.config.route {
            LlmRoute::Relay => self.send_relay(&req).await,
            LlmRoute::Direct => self.send_direct(&req).await,
        }?;

        if let Some(ref usage) = response.usage {
            log::debug!(
                "LLM usage: {} prompt + {} completion tokens",
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }
        Ok(response)
    }
}
