//! Chat-completions wire format shared by the relay and direct routes.
//!
//! The relay forwards the body to OpenRouter unchanged and passes the
//! provider's JSON answer back, so both routes parse the same response.
//! Only the error body differs: the relay answers `{"error": "text"}`,
//! the provider `{"error": {"message": "text"}}`.

use serde::Deserialize;
use serde_json::{json, Value};

use biobrain_core::ports::{ChatRequest, ChatResponse, TokenUsage};
use biobrain_types::{ChatError, Result, message::Message};

/// Build the JSON body. Sampling parameters are only sent on the direct
/// route; the relay applies its own.
pub fn build_request_body(req: &ChatRequest, include_sampling: bool) -> Value {
    let mut messages: Vec<Value> = Vec::with_capacity(req.messages.len() + 1);
    if let Some(ref prompt) = req.system_prompt {
        messages.push(json!({ "role": "system", "content": prompt }));
    }
    messages.extend(req.messages.iter().map(message_to_json));

    let mut body = json!({
        "model": req.model,
        "messages": messages,
    });

    if include_sampling {
        body["temperature"] = json!(req.temperature);
        body["max_tokens"] = json!(req.max_tokens);
    }

    body
}

fn message_to_json(msg: &Message) -> Value {
    json!({
        "role": msg.role.as_str(),
        "content": msg.content,
    })
}

/// Parse a successful completion body.
pub fn parse_completion(body: &str) -> Result<ChatResponse> {
    let data: ApiResponse =
        serde_json::from_str(body).map_err(|e| ChatError::Llm(e.to_string()))?;

    let choice = data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::Llm("No choices in response".to_string()))?;

    let usage = data.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(ChatResponse {
        text: choice.message.content.unwrap_or_default(),
        usage,
    })
}

/// Turn a non-2xx answer into an error, preferring the message the
/// server put in the body over `fallback`.
pub fn parse_error(status: u16, body: &str, fallback: &str) -> ChatError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .map(|field| match field {
            ErrorField::Text(text) => text,
            ErrorField::Detail { message } => message,
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string());

    ChatError::Api { status, message }
}

// ─── API response types ──────────────────────────────────────

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<ErrorField>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Text(String),
    Detail { message: String },
}
