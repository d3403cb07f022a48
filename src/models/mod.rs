use serde::{Deserialize, Serialize};

pub mod agent;
pub mod profile;
pub mod recommendation;
pub mod record;

pub use agent::{
    ChatRequest, ChatResponse, FeedbackAnalysis, FeedbackAnalysisRequest, PatternAnalysis,
    Patterns,
};
pub use profile::{
    PreferenceCategory, Preferences, PreferencesPatch, Profile, Routines, UpsertProfileRequest,
};
pub use recommendation::{
    FeedbackByType, FeedbackRequest, FeedbackStats, FeedbackSummary, GeneratedRecommendation,
    GeneratedRecommendations, HistoryQuery, HistoryResponse, LikeCounts, RecommendationItem,
    RecommendationRequest, RecommendationResponse, RecommendationType, SavedRecommendation,
};
pub use record::{
    CreateRecordRequest, LifeRecord, Pagination, RecordListResponse, RecordPage, RecordQuery,
    RecordStats, RecordType, RecordTypeCounts, TagCount, UpdateRecordRequest,
};

/// Envelope used by mutating endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}
