use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

use crate::{
    error::{AppError, AppResult},
    services::providers::LanguageModel,
};

const JSON_ONLY_INSTRUCTION: &str =
    "Respond with valid JSON only. Do not include any text outside the JSON.";

static TAGGED_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```json\n?([\s\S]*?)\n?```").expect("valid regex"));
static PLAIN_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```\n?([\s\S]*?)\n?```").expect("valid regex"));

/// Pulls the JSON payload out of a model reply
///
/// Prefers a ```json fenced block, then any fenced block, then the raw text.
pub fn extract_json_payload(text: &str) -> &str {
    TAGGED_FENCE
        .captures(text)
        .or_else(|| PLAIN_FENCE.captures(text))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
        .filter(|payload| !payload.trim().is_empty())
        .unwrap_or(text)
        .trim()
}

/// Asks the model for JSON and deserializes the answer into `T`
///
/// Unparsable output is an [`AppError::Upstream`]; it is neither retried nor
/// repaired.
pub async fn generate_json<T: DeserializeOwned>(
    model: &dyn LanguageModel,
    prompt: &str,
) -> AppResult<T> {
    let prompt = format!("{}\n\n{}", prompt, JSON_ONLY_INSTRUCTION);
    let text = model.generate(&prompt, true).await?;
    let payload = extract_json_payload(&text);

    serde_json::from_str(payload).map_err(|e| {
        tracing::error!(
            provider = model.name(),
            error = %e,
            payload = %payload,
            "Failed to parse model response as JSON"
        );
        AppError::Upstream(format!("Could not parse AI response: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::MockLanguageModel;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Answer {
        answer: u32,
    }

    #[test]
    fn test_extract_tagged_fence() {
        let text = "Here you go:\n```json\n{\"answer\": 42}\n```\nEnjoy!";
        assert_eq!(extract_json_payload(text), "{\"answer\": 42}");
    }

    #[test]
    fn test_extract_untagged_fence() {
        let text = "```\n{\"answer\": 7}\n```";
        assert_eq!(extract_json_payload(text), "{\"answer\": 7}");
    }

    #[test]
    fn test_extract_falls_back_to_raw_text() {
        let text = "  {\"answer\": 1}\n";
        assert_eq!(extract_json_payload(text), "{\"answer\": 1}");
    }

    #[test]
    fn test_tagged_fence_preferred_over_plain() {
        let text = "```\nnot json\n```\n```json\n{\"answer\": 2}\n```";
        assert_eq!(extract_json_payload(text), "{\"answer\": 2}");
    }

    #[tokio::test]
    async fn test_generate_json_appends_instruction_and_parses() {
        let mut model = MockLanguageModel::new();
        model
            .expect_generate()
            .withf(|prompt, json_mode| prompt.ends_with(JSON_ONLY_INSTRUCTION) && *json_mode)
            .times(1)
            .returning(|_, _| Ok("```json\n{\"answer\": 42}\n```".to_string()));
        model.expect_name().return_const("mock");

        let answer: Answer = generate_json(&model, "What is the answer?").await.unwrap();
        assert_eq!(answer, Answer { answer: 42 });
    }

    #[tokio::test]
    async fn test_generate_json_unparsable_is_upstream() {
        let mut model = MockLanguageModel::new();
        model
            .expect_generate()
            .returning(|_, _| Ok("Sorry, I cannot help with that.".to_string()));
        model.expect_name().return_const("mock");

        let result: AppResult<Answer> = generate_json(&model, "prompt").await;
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_generate_json_propagates_model_error() {
        let mut model = MockLanguageModel::new();
        model
            .expect_generate()
            .returning(|_, _| Err(AppError::Upstream("quota exceeded".to_string())));

        let result: AppResult<Answer> = generate_json(&model, "prompt").await;
        assert!(matches!(result, Err(AppError::Upstream(ref m)) if m == "quota exceeded"));
    }
}
