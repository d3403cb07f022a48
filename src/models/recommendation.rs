use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;
use validator::Validate;

use super::RecordType;

pub const DEFAULT_RECOMMENDATION_LIMIT: u32 = 5;
/// Upper bound on rows returned by the history endpoint
pub const HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationType {
    Travel,
    Food,
    Exercise,
}

impl RecommendationType {
    pub const ALL: [RecommendationType; 3] = [
        RecommendationType::Travel,
        RecommendationType::Food,
        RecommendationType::Exercise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationType::Travel => "travel",
            RecommendationType::Food => "food",
            RecommendationType::Exercise => "exercise",
        }
    }

    /// Human label used in prompts
    pub fn label(&self) -> &'static str {
        match self {
            RecommendationType::Travel => "travel destinations",
            RecommendationType::Food => "food and menus",
            RecommendationType::Exercise => "exercises and workout routes",
        }
    }

    /// Record type whose history informs this kind of recommendation
    pub fn record_type(&self) -> RecordType {
        match self {
            RecommendationType::Travel => RecordType::Travel,
            RecommendationType::Food => RecordType::Food,
            RecommendationType::Exercise => RecordType::Exercise,
        }
    }
}

impl Display for RecommendationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecommendationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecommendationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown recommendation type '{}'", s))
    }
}

fn default_limit() -> u32 {
    DEFAULT_RECOMMENDATION_LIMIT
}

/// Body of `POST /api/recommendations`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct RecommendationRequest {
    #[serde(rename = "type")]
    pub recommendation_type: RecommendationType,
    /// Free text such as weather or mood
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Overrides the profile location for this request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Rejected outside 1..=10, never clamped
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 10, message = "Limit must be between 1 and 10"))]
    pub limit: u32,
}

/// One suggestion as returned by the language model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct GeneratedRecommendation {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub reason: String,
    /// Expected in [0, 1]; passed through as given
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Expected shape of the model's JSON answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct GeneratedRecommendations {
    #[validate(nested)]
    pub recommendations: Vec<GeneratedRecommendation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackSummary {
    pub liked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A persisted recommendation history row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecommendation {
    pub id: Uuid,
    pub profile_id: Uuid,
    #[serde(rename = "type")]
    pub recommendation_type: RecommendationType,
    pub name: String,
    pub reason: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Most recent feedback, if any was given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationItem {
    pub id: Uuid,
    pub name: String,
    pub reason: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<SavedRecommendation> for RecommendationItem {
    fn from(saved: SavedRecommendation) -> Self {
        Self {
            id: saved.id,
            name: saved.name,
            reason: saved.reason,
            score: saved.score,
            details: saved.details,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    #[serde(rename = "type")]
    pub recommendation_type: RecommendationType,
    pub recommendations: Vec<RecommendationItem>,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Query string of `GET /api/recommendations/history`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub recommendation_type: Option<RecommendationType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryResponse {
    pub history: Vec<SavedRecommendation>,
}

/// Body of `POST /api/recommendations/:id/feedback`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct FeedbackRequest {
    pub liked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LikeCounts {
    pub liked: usize,
    pub disliked: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackByType {
    pub food: LikeCounts,
    pub travel: LikeCounts,
    pub exercise: LikeCounts,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackStats {
    pub total: usize,
    pub liked: usize,
    pub disliked: usize,
    pub by_type: FeedbackByType,
}

impl FeedbackStats {
    /// Tallies (recommendation type, liked) pairs
    pub fn tally<I>(feedback: I) -> Self
    where
        I: IntoIterator<Item = (RecommendationType, bool)>,
    {
        let mut stats = FeedbackStats::default();
        for (recommendation_type, liked) in feedback {
            let counts = match recommendation_type {
                RecommendationType::Food => &mut stats.by_type.food,
                RecommendationType::Travel => &mut stats.by_type.travel,
                RecommendationType::Exercise => &mut stats.by_type.exercise,
            };
            if liked {
                counts.liked += 1;
                stats.liked += 1;
            } else {
                counts.disliked += 1;
                stats.disliked += 1;
            }
            stats.total += 1;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_defaults_to_five() {
        let request: RecommendationRequest =
            serde_json::from_str(r#"{"type":"food"}"#).unwrap();
        assert_eq!(request.limit, 5);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_limit_out_of_range_is_rejected() {
        for limit in [0, 11] {
            let request: RecommendationRequest =
                serde_json::from_value(serde_json::json!({ "type": "travel", "limit": limit }))
                    .unwrap();
            assert!(request.validate().is_err(), "limit {} accepted", limit);
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result: Result<RecommendationRequest, _> =
            serde_json::from_str(r#"{"type":"shopping"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_generated_recommendation_requires_name() {
        let output: GeneratedRecommendations = serde_json::from_value(serde_json::json!({
            "recommendations": [{ "name": "", "reason": "tasty", "score": 0.9 }]
        }))
        .unwrap();
        assert!(output.validate().is_err());
    }

    #[test]
    fn test_feedback_tally() {
        let stats = FeedbackStats::tally(vec![
            (RecommendationType::Food, true),
            (RecommendationType::Food, false),
            (RecommendationType::Travel, true),
        ]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.liked, 2);
        assert_eq!(stats.disliked, 1);
        assert_eq!(stats.by_type.food, LikeCounts { liked: 1, disliked: 1 });
        assert_eq!(stats.by_type.exercise, LikeCounts::default());
    }

    #[test]
    fn test_response_uses_camel_case() {
        let response = RecommendationResponse {
            recommendation_type: RecommendationType::Food,
            recommendations: vec![],
            generated_at: Utc::now(),
            context: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["type"], "food");
        assert!(json.get("generatedAt").is_some());
        assert!(json.get("context").is_none());
    }
}
