use std::sync::Arc;

use crate::{
    db::{ProfileRepository, RecordRepository},
    error::AppResult,
    models::{FeedbackAnalysis, PatternAnalysis, Patterns, RecordQuery},
    services::{
        llm::generate_json,
        prompts,
        providers::{ChatMessage, LanguageModel},
        recommendations::require_profile,
    },
};

/// Most recent records included in a pattern analysis
pub const ANALYSIS_RECORD_LIMIT: i64 = 50;

fn not_enough_records() -> PatternAnalysis {
    PatternAnalysis {
        patterns: Patterns::default(),
        suggestions: vec!["Add a few more records so your patterns can be analysed!".to_string()],
        insights: "There are not enough records to analyse yet.".to_string(),
    }
}

/// Asks the model to find taste patterns in the record log
///
/// With no records there is nothing to analyse and the model is not called.
pub async fn analyze_patterns(
    profiles: Arc<dyn ProfileRepository>,
    records: Arc<dyn RecordRepository>,
    model: Arc<dyn LanguageModel>,
) -> AppResult<PatternAnalysis> {
    let profile = require_profile(profiles.as_ref()).await?;

    let page = records
        .list(
            profile.id,
            &RecordQuery {
                record_type: None,
                limit: Some(ANALYSIS_RECORD_LIMIT),
                offset: None,
            },
        )
        .await?;

    if page.records.is_empty() {
        return Ok(not_enough_records());
    }

    let prompt = prompts::build_analysis_prompt(&profile, &page.records);
    let analysis: PatternAnalysis = generate_json(model.as_ref(), &prompt).await?;

    tracing::info!(
        profile_id = %profile.id,
        records = page.records.len(),
        suggestions = analysis.suggestions.len(),
        "Pattern analysis completed"
    );

    Ok(analysis)
}

/// Asks the model how a single like or dislike should change future suggestions
pub async fn process_feedback(
    model: Arc<dyn LanguageModel>,
    recommendation: &str,
    liked: bool,
    reason: Option<&str>,
) -> AppResult<FeedbackAnalysis> {
    let prompt = prompts::build_feedback_prompt(recommendation, liked, reason);
    let analysis: FeedbackAnalysis = generate_json(model.as_ref(), &prompt).await?;

    tracing::info!(
        recommendation,
        liked,
        avoid = analysis.avoid.len(),
        prefer = analysis.prefer.len(),
        "Feedback analysed"
    );

    Ok(analysis)
}

/// Free-form conversation with the agent, primed with the user's name
pub async fn chat(
    profiles: Arc<dyn ProfileRepository>,
    model: Arc<dyn LanguageModel>,
    message: String,
) -> AppResult<String> {
    let profile = require_profile(profiles.as_ref()).await?;

    let history = vec![
        ChatMessage::user(prompts::chat_system_context(&profile)),
        ChatMessage::model(prompts::chat_greeting(&profile)),
        ChatMessage::user(message),
    ];

    model.chat(&history).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MockProfileRepository, MockRecordRepository};
    use crate::error::AppError;
    use crate::models::{LifeRecord, Preferences, Profile, RecordPage, RecordType, Routines};
    use crate::services::providers::{ChatRole, MockLanguageModel};
    use chrono::Utc;
    use uuid::Uuid;

    fn profiles() -> MockProfileRepository {
        let now = Utc::now();
        let profile = Profile {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            location: None,
            preferences: Preferences::default(),
            routines: Routines::default(),
            created_at: now,
            updated_at: now,
        };
        let mut profiles = MockProfileRepository::new();
        profiles
            .expect_find_first()
            .returning(move || Ok(Some(profile.clone())));
        profiles
    }

    fn records_with(records: Vec<LifeRecord>) -> MockRecordRepository {
        let mut repo = MockRecordRepository::new();
        repo.expect_list().returning(move |_, _| {
            Ok(RecordPage {
                records: records.clone(),
                total: records.len() as i64,
            })
        });
        repo
    }

    #[tokio::test]
    async fn test_analysis_without_records_skips_model() {
        let mut model = MockLanguageModel::new();
        model.expect_generate().times(0);

        let analysis = analyze_patterns(
            Arc::new(profiles()),
            Arc::new(records_with(vec![])),
            Arc::new(model),
        )
        .await
        .unwrap();

        assert!(analysis.patterns.food.is_empty());
        assert_eq!(analysis.suggestions.len(), 1);
    }

    #[tokio::test]
    async fn test_analysis_parses_model_output() {
        let now = Utc::now();
        let record = LifeRecord {
            id: Uuid::new_v4(),
            record_type: RecordType::Exercise,
            title: "Han river run".to_string(),
            description: Some("10km".to_string()),
            rating: Some(4),
            tags: vec!["running".to_string()],
            location: None,
            date: now.date_naive(),
            metadata: None,
            created_at: now,
            updated_at: now,
        };

        let mut model = MockLanguageModel::new();
        model.expect_generate().times(1).returning(|prompt, _| {
            assert!(prompt.contains("Han river run"));
            Ok(r#"{"patterns":{"food":[],"travel":[],"exercise":["long runs"]},"suggestions":["swimming"],"insights":"Active runner"}"#.to_string())
        });

        let analysis = analyze_patterns(
            Arc::new(profiles()),
            Arc::new(records_with(vec![record])),
            Arc::new(model),
        )
        .await
        .unwrap();

        assert_eq!(analysis.patterns.exercise, vec!["long runs"]);
        assert_eq!(analysis.insights, "Active runner");
    }

    #[tokio::test]
    async fn test_chat_replays_primed_history() {
        let mut model = MockLanguageModel::new();
        model.expect_chat().times(1).returning(|history| {
            assert_eq!(history.len(), 3);
            assert_eq!(history[0].role, ChatRole::User);
            assert!(history[0].content.contains("Alice"));
            assert_eq!(history[1].role, ChatRole::Model);
            assert_eq!(history[2].content, "Where should I run today?");
            Ok("Try the Han river trail.".to_string())
        });

        let reply = chat(
            Arc::new(profiles()),
            Arc::new(model),
            "Where should I run today?".to_string(),
        )
        .await
        .unwrap();

        assert_eq!(reply, "Try the Han river trail.");
    }

    #[tokio::test]
    async fn test_chat_without_profile_is_not_found() {
        let mut profiles = MockProfileRepository::new();
        profiles.expect_find_first().returning(|| Ok(None));
        let mut model = MockLanguageModel::new();
        model.expect_chat().times(0);

        let result = chat(Arc::new(profiles), Arc::new(model), "hi".to_string()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_feedback_analysis_parses_model_output() {
        let mut model = MockLanguageModel::new();
        model.expect_generate().times(1).returning(|prompt, json_mode| {
            assert!(json_mode);
            assert!(prompt.contains("\"Doenjang jjigae\" as disliked"));
            assert!(prompt.contains("Reason: too salty"));
            Ok(r#"```json
{"adjustment":"Suggest milder stews","avoid":["salty soups"],"prefer":["light broths"],"note":"Noted!"}
```"#
                .to_string())
        });

        let analysis = process_feedback(
            Arc::new(model),
            "Doenjang jjigae",
            false,
            Some("too salty"),
        )
        .await
        .unwrap();

        assert_eq!(analysis.adjustment, "Suggest milder stews");
        assert_eq!(analysis.avoid, vec!["salty soups"]);
        assert_eq!(analysis.prefer, vec!["light broths"]);
        assert_eq!(analysis.note, "Noted!");
    }

    #[tokio::test]
    async fn test_feedback_analysis_rejects_unparseable_output() {
        let mut model = MockLanguageModel::new();
        model
            .expect_generate()
            .returning(|_, _| Ok("I cannot help with that".to_string()));

        let err = process_feedback(Arc::new(model), "Bibimbap", true, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
