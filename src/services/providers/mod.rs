//! Language model provider abstraction
//!
//! The recommendation pipeline only needs two things from a model: a single
//! completion for a prompt, and a reply to a role-tagged conversation. Each
//! backend (currently Gemini) implements both.
use serde::{Deserialize, Serialize};

use crate::error::AppResult;

pub mod gemini;

pub use gemini::GeminiProvider;

/// Who authored a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generates a completion for a single prompt
    ///
    /// With `json_mode` set the provider asks the backend for a JSON response
    /// body; callers must still parse and validate the text themselves.
    async fn generate(&self, prompt: &str, json_mode: bool) -> AppResult<String>;

    /// Replays `history` and returns the reply to its last message
    async fn chat(&self, history: &[ChatMessage]) -> AppResult<String>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
