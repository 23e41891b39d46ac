use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JS interop error: {0}")]
    JsInterop(String),

    #[error("A response is already pending")]
    Busy,

    #[error("Message is empty")]
    EmptyInput,

    #[error("{0}")]
    Other(String),
}

impl ChatError {
    /// Text shown to the user in place of an answer.
    pub fn user_message(&self) -> String {
        let detail = match self {
            ChatError::Api { message, .. }
            | ChatError::Config(message)
            | ChatError::Network(message)
            | ChatError::Llm(message) => message.clone(),
            other => other.to_string(),
        };
        format!(
            "Sorry, I encountered an error: {}. Please check your API key and try again.",
            detail
        )
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::Serialization(e.to_string())
    }
}
