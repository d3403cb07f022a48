use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Patterns {
    #[serde(default)]
    pub food: Vec<String>,
    #[serde(default)]
    pub travel: Vec<String>,
    #[serde(default)]
    pub exercise: Vec<String>,
}

/// Taste patterns the model found in the record log
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatternAnalysis {
    #[serde(default)]
    pub patterns: Patterns,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub insights: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub reply: String,
}

/// Body of `POST /api/agent/feedback-analysis`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct FeedbackAnalysisRequest {
    #[validate(length(min = 1, message = "Recommendation name is required"))]
    pub recommendation: String,
    pub liked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// How one piece of feedback should steer future recommendations
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeedbackAnalysis {
    #[serde(default)]
    pub adjustment: String,
    #[serde(default)]
    pub avoid: Vec<String>,
    #[serde(default)]
    pub prefer: Vec<String>,
    #[serde(default)]
    pub note: String,
}
