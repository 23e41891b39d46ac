use serde::{Deserialize, Serialize};

/// Upper bound on stored conversations.
pub const MAX_CONVERSATIONS: usize = 50;

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub llm: LlmConfig,
    pub image: ImageConfig,
    pub storage: StorageConfig,
    pub system_prompt: String,
    /// Maximum number of conversations kept in history
    pub history_limit: usize,
    /// Characters of the first question kept in a conversation title
    pub title_max_chars: usize,
    /// Longest question accepted from the input box
    pub max_input_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            image: ImageConfig::default(),
            storage: StorageConfig::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_limit: MAX_CONVERSATIONS,
            title_max_chars: 50,
            max_input_chars: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub route: LlmRoute,
    pub model: String,
    /// Serverless relay endpoint that holds the provider key
    pub relay_url: String,
    /// Override for the direct provider base URL
    pub api_base: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            route: LlmRoute::Relay,
            model: "openai/gpt-3.5-turbo".to_string(),
            relay_url: "/api/chat".to_string(),
            api_base: None,
            max_tokens: 1000,
            temperature: 0.7,
        }
    }
}

impl LlmConfig {
    pub fn base_url(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or(OPENROUTER_BASE_URL)
    }
}

pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api";

/// How requests reach the LLM provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmRoute {
    /// Through the serverless relay; no key needed in the browser
    Relay,
    /// Straight to the provider with a user-supplied key
    Direct,
}

impl LlmRoute {
    pub fn all() -> &'static [LlmRoute] {
        &[LlmRoute::Relay, LlmRoute::Direct]
    }

    pub fn label(&self) -> &str {
        match self {
            LlmRoute::Relay => "Relay",
            LlmRoute::Direct => "Direct (own key)",
        }
    }

    pub fn needs_api_key(&self) -> bool {
        matches!(self, LlmRoute::Direct)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub base_url: String,
    pub width: u32,
    pub height: u32,
    pub model: String,
    pub enhance: bool,
    pub nologo: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base_url: "https://image.pollinations.ai/prompt".to_string(),
            width: 1024,
            height: 768,
            model: "flux".to_string(),
            enhance: true,
            nologo: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendType,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendType::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackendType {
    /// Auto-detect best available backend
    Auto,
    Memory,
    LocalStorage,
}

const DEFAULT_SYSTEM_PROMPT: &str = r#"You are BioBrain AI, an expert biology tutor for Class 11 students. Your role is to provide accurate, well-structured, and academically rigorous explanations of biological concepts.

CRITICAL INSTRUCTIONS:
1. ALWAYS provide accurate, factual information based on standard Class 11 biology curriculum
2. Structure your answers with clear headings, bullet points, and numbered lists
3. Use simple language suitable for high school students
4. Include relevant examples and real-world applications
5. If you're unsure about something, say so - never make up information
6. Keep answers concise but comprehensive (200-400 words typically)
7. End with a brief summary or key takeaway when appropriate
8. For diagram requests, describe what the diagram should show in detail

ANSWER FORMAT:
- Start with a brief definition or overview
- Break down complex concepts into digestible parts
- Use analogies when helpful
- Highlight key terms
- Provide step-by-step explanations for processes

TOPICS TO COVER (Class 11 Biology):
- Cell biology, biomolecules, plant physiology, human physiology
- Photosynthesis, respiration, transport systems
- Body systems (digestive, respiratory, circulatory, excretory, nervous, endocrine)
- Structural organization in plants and animals

Remember: Accuracy and educational value are paramount. You're helping students learn, not just answer questions.
"#;
