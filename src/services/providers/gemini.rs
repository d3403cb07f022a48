//! Google Gemini provider
//!
//! Talks to the `generateContent` endpoint of the Generative Language API.
//! Single prompts and chats use the same endpoint; a chat simply sends the
//! whole role-tagged history as `contents`.
use crate::{
    error::{AppError, AppResult},
    services::providers::{ChatMessage, ChatRole, LanguageModel},
};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct GeminiProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl<'a> Content<'a> {
    fn new(role: ChatRole, text: &'a str) -> Self {
        let role = match role {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        };
        Self {
            role,
            parts: vec![Part { text }],
        }
    }
}

impl GeminiProvider {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        )
    }

    /// Sends a `generateContent` call and returns the first candidate's text
    async fn generate_content(&self, request: &GenerateContentRequest<'_>) -> AppResult<String> {
        if self.api_key.is_empty() {
            return Err(AppError::Upstream(
                "Gemini API key is not configured".to_string(),
            ));
        }

        let response = self
            .http_client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Gemini API returned status {}: {}",
                status, body
            )));
        }

        let body: GenerateContentResponse = response.json().await?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AppError::Upstream(
                "Gemini returned no candidate text".to_string(),
            ));
        }

        tracing::debug!(model = %self.model, chars = text.len(), "Gemini response received");

        Ok(text)
    }
}

#[async_trait::async_trait]
impl LanguageModel for GeminiProvider {
    async fn generate(&self, prompt: &str, json_mode: bool) -> AppResult<String> {
        let request = GenerateContentRequest {
            contents: vec![Content::new(ChatRole::User, prompt)],
            generation_config: json_mode.then_some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        };

        self.generate_content(&request).await
    }

    async fn chat(&self, history: &[ChatMessage]) -> AppResult<String> {
        if history.is_empty() {
            return Err(AppError::InvalidInput(
                "Chat history cannot be empty".to_string(),
            ));
        }

        let request = GenerateContentRequest {
            contents: history
                .iter()
                .map(|message| Content::new(message.role, &message.content))
                .collect(),
            generation_config: None,
        };

        self.generate_content(&request).await
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
