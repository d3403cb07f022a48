//! Typed HTTP client for the life agent API
//!
//! Wraps every endpoint in an async method returning the shared model
//! types, so frontends and scripts written in Rust do not hand-roll JSON.
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use uuid::Uuid;

use crate::{
    config::ClientConfig,
    models::{
        ApiResponse, ChatRequest, ChatResponse, CreateRecordRequest, FeedbackAnalysis,
        FeedbackAnalysisRequest, FeedbackRequest,
        FeedbackStats, HistoryResponse, LifeRecord, PatternAnalysis, PreferencesPatch, Profile,
        RecommendationRequest, RecommendationResponse, RecommendationType, RecordListResponse,
        RecordQuery, RecordStats, Routines, SavedRecommendation, UpdateRecordRequest,
        UpsertProfileRequest,
    },
};

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },
}

impl ClientError {
    /// Suggestion to show next to the error, for the statuses that have one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ClientError::Api { status, message }
                if *status == StatusCode::NOT_FOUND
                    && message.to_lowercase().contains("profile") =>
            {
                Some("Profile not found. Please set up your profile first.")
            }
            ClientError::Api { status, .. } if *status == StatusCode::SERVICE_UNAVAILABLE => {
                Some("The AI service is unavailable. Check the language-model API key.")
            }
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct ApiClient {
    http_client: HttpClient,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Builds a client for `PUBLIC_API_URL`
    pub fn from_env() -> anyhow::Result<Self> {
        let config = ClientConfig::from_env()?;
        Ok(Self::new(config.public_api_url))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Sends the request and decodes a success body, or the `{error}` body
    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> ClientResult<T> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ClientError::Api { status, message });
        }

        Ok(response.json().await?)
    }

    /// Unwraps the `data` field of an [`ApiResponse`] envelope
    async fn send_data<T: DeserializeOwned>(request: RequestBuilder) -> ClientResult<T> {
        let envelope: ApiResponse<T> = Self::send(request).await?;
        envelope.data.ok_or_else(|| ClientError::Api {
            status: StatusCode::OK,
            message: envelope
                .message
                .unwrap_or_else(|| "Response carried no data".to_string()),
        })
    }

    // Profile

    pub async fn get_profile(&self) -> ClientResult<Profile> {
        Self::send(self.http_client.get(self.url("/profile"))).await
    }

    pub async fn save_profile(&self, request: &UpsertProfileRequest) -> ClientResult<Profile> {
        Self::send_data(self.http_client.post(self.url("/profile")).json(request)).await
    }

    pub async fn update_preferences(&self, patch: &PreferencesPatch) -> ClientResult<Profile> {
        Self::send_data(
            self.http_client
                .patch(self.url("/profile/preferences"))
                .json(patch),
        )
        .await
    }

    pub async fn update_routines(&self, patch: &Routines) -> ClientResult<Profile> {
        Self::send_data(self.http_client.patch(self.url("/profile/routines")).json(patch)).await
    }

    // Recommendations

    pub async fn get_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> ClientResult<RecommendationResponse> {
        Self::send(self.http_client.post(self.url("/recommendations")).json(request)).await
    }

    pub async fn recommendation_history(
        &self,
        recommendation_type: Option<RecommendationType>,
    ) -> ClientResult<Vec<SavedRecommendation>> {
        let mut request = self.http_client.get(self.url("/recommendations/history"));
        if let Some(recommendation_type) = recommendation_type {
            request = request.query(&[("type", recommendation_type.as_str())]);
        }
        let response: HistoryResponse = Self::send(request).await?;
        Ok(response.history)
    }

    pub async fn send_feedback(
        &self,
        recommendation_id: Uuid,
        feedback: &FeedbackRequest,
    ) -> ClientResult<()> {
        let _: ApiResponse<serde_json::Value> = Self::send(
            self.http_client
                .post(self.url(&format!("/recommendations/{}/feedback", recommendation_id)))
                .json(feedback),
        )
        .await?;
        Ok(())
    }

    pub async fn feedback_stats(&self) -> ClientResult<FeedbackStats> {
        Self::send(self.http_client.get(self.url("/recommendations/feedback/stats"))).await
    }

    // Records

    pub async fn list_records(&self, query: &RecordQuery) -> ClientResult<RecordListResponse> {
        Self::send(self.http_client.get(self.url("/records")).query(query)).await
    }

    pub async fn get_record(&self, id: Uuid) -> ClientResult<LifeRecord> {
        Self::send(self.http_client.get(self.url(&format!("/records/{}", id)))).await
    }

    pub async fn create_record(&self, request: &CreateRecordRequest) -> ClientResult<LifeRecord> {
        Self::send_data(self.http_client.post(self.url("/records")).json(request)).await
    }

    pub async fn update_record(
        &self,
        id: Uuid,
        request: &UpdateRecordRequest,
    ) -> ClientResult<LifeRecord> {
        Self::send_data(
            self.http_client
                .patch(self.url(&format!("/records/{}", id)))
                .json(request),
        )
        .await
    }

    pub async fn delete_record(&self, id: Uuid) -> ClientResult<()> {
        let _: ApiResponse<serde_json::Value> =
            Self::send(self.http_client.delete(self.url(&format!("/records/{}", id)))).await?;
        Ok(())
    }

    pub async fn record_stats(&self) -> ClientResult<RecordStats> {
        Self::send(self.http_client.get(self.url("/records/stats/summary"))).await
    }

    // Agent

    pub async fn analyze_patterns(&self) -> ClientResult<PatternAnalysis> {
        Self::send(self.http_client.get(self.url("/agent/analysis"))).await
    }

    pub async fn chat(&self, message: impl Into<String>) -> ClientResult<String> {
        let request = ChatRequest {
            message: message.into(),
        };
        let response: ChatResponse =
            Self::send(self.http_client.post(self.url("/agent/chat")).json(&request)).await?;
        Ok(response.reply)
    }

    pub async fn analyze_feedback(
        &self,
        request: &FeedbackAnalysisRequest,
    ) -> ClientResult<FeedbackAnalysis> {
        Self::send(
            self.http_client
                .post(self.url("/agent/feedback-analysis"))
                .json(request),
        )
        .await
    }
}
