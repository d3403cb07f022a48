use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use life_agent_api::{
    api::{create_router, AppState},
    db::{ProfileRepository, RecommendationRepository, RecordRepository},
    error::{AppError, AppResult},
    models::{
        CreateRecordRequest, FeedbackRequest, FeedbackStats, FeedbackSummary,
        GeneratedRecommendation, LifeRecord, PreferencesPatch, Profile, RecommendationType,
        RecordPage, RecordQuery, RecordStats, Routines, SavedRecommendation, UpdateRecordRequest,
        UpsertProfileRequest,
    },
    services::providers::{ChatMessage, LanguageModel},
};

#[derive(Default)]
pub struct InMemoryProfiles {
    profiles: RwLock<Vec<Profile>>,
}

#[async_trait]
impl ProfileRepository for InMemoryProfiles {
    async fn find_first(&self) -> AppResult<Option<Profile>> {
        Ok(self.profiles.read().await.first().cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self
            .profiles
            .read()
            .await
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn upsert(&self, request: &UpsertProfileRequest) -> AppResult<Profile> {
        let mut profiles = self.profiles.write().await;
        let now = Utc::now();

        if let Some(profile) = profiles.first_mut() {
            profile.name.clone_from(&request.name);
            profile.location.clone_from(&request.location);
            if let Some(preferences) = &request.preferences {
                profile.preferences = preferences.clone();
            }
            if let Some(routines) = &request.routines {
                profile.routines = routines.clone();
            }
            profile.updated_at = now;
            return Ok(profile.clone());
        }

        let profile = Profile {
            id: Uuid::new_v4(),
            name: request.name.clone(),
            location: request.location.clone(),
            preferences: request.preferences.clone().unwrap_or_default(),
            routines: request.routines.clone().unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        profiles.push(profile.clone());
        Ok(profile)
    }

    async fn update_preferences(
        &self,
        profile_id: Uuid,
        patch: &PreferencesPatch,
    ) -> AppResult<Profile> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .iter_mut()
            .find(|p| p.id == profile_id)
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
        patch.apply_to(&mut profile.preferences);
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn update_routines(&self, profile_id: Uuid, patch: &Routines) -> AppResult<Profile> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .iter_mut()
            .find(|p| p.id == profile_id)
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
        profile.routines.merge(patch);
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }
}

#[derive(Default)]
pub struct InMemoryRecords {
    records: RwLock<Vec<(Uuid, LifeRecord)>>,
}

impl InMemoryRecords {
    async fn owned_by(&self, profile_id: Uuid) -> Vec<LifeRecord> {
        let mut records: Vec<LifeRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|(owner, _)| *owner == profile_id)
            .map(|(_, record)| record.clone())
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        records
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecords {
    async fn find_by_id(&self, profile_id: Uuid, id: Uuid) -> AppResult<Option<LifeRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|(owner, record)| *owner == profile_id && record.id == id)
            .map(|(_, record)| record.clone()))
    }

    async fn list(&self, profile_id: Uuid, query: &RecordQuery) -> AppResult<RecordPage> {
        let matching: Vec<LifeRecord> = self
            .owned_by(profile_id)
            .await
            .into_iter()
            .filter(|r| query.record_type.map_or(true, |t| r.record_type == t))
            .collect();
        let total = matching.len() as i64;
        let records = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .collect();
        Ok(RecordPage { records, total })
    }

    async fn create(
        &self,
        profile_id: Uuid,
        request: &CreateRecordRequest,
    ) -> AppResult<LifeRecord> {
        let now = Utc::now();
        let record = LifeRecord {
            id: Uuid::new_v4(),
            record_type: request.record_type,
            title: request.title.clone(),
            description: request.description.clone(),
            rating: request.rating,
            tags: request.tags.clone(),
            location: request.location.clone(),
            date: request.date.unwrap_or_else(|| now.date_naive()),
            metadata: request.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        self.records.write().await.push((profile_id, record.clone()));
        Ok(record)
    }

    async fn update(
        &self,
        profile_id: Uuid,
        id: Uuid,
        request: &UpdateRecordRequest,
    ) -> AppResult<Option<LifeRecord>> {
        let mut records = self.records.write().await;
        Ok(records
            .iter_mut()
            .find(|(owner, record)| *owner == profile_id && record.id == id)
            .map(|(_, record)| {
                request.apply_to(record);
                record.updated_at = Utc::now();
                record.clone()
            }))
    }

    async fn delete(&self, profile_id: Uuid, id: Uuid) -> AppResult<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|(owner, record)| !(*owner == profile_id && record.id == id));
        Ok(records.len() < before)
    }

    async fn stats(&self, profile_id: Uuid) -> AppResult<RecordStats> {
        Ok(RecordStats::from_records(&self.owned_by(profile_id).await))
    }
}

#[derive(Default)]
pub struct InMemoryRecommendations {
    history: RwLock<Vec<SavedRecommendation>>,
    feedback: RwLock<Vec<(Uuid, FeedbackSummary)>>,
}

impl InMemoryRecommendations {
    pub async fn saved_count(&self) -> usize {
        self.history.read().await.len()
    }

    pub async fn feedback_count(&self) -> usize {
        self.feedback.read().await.len()
    }
}

#[async_trait]
impl RecommendationRepository for InMemoryRecommendations {
    async fn save_many(
        &self,
        profile_id: Uuid,
        recommendation_type: RecommendationType,
        items: &[GeneratedRecommendation],
        context: Option<String>,
    ) -> AppResult<Vec<SavedRecommendation>> {
        let now = Utc::now();
        let saved: Vec<SavedRecommendation> = items
            .iter()
            .map(|item| SavedRecommendation {
                id: Uuid::new_v4(),
                profile_id,
                recommendation_type,
                name: item.name.clone(),
                reason: item.reason.clone(),
                score: item.score,
                details: item.details.clone(),
                context: context.clone(),
                created_at: now,
                feedback: None,
            })
            .collect();
        self.history.write().await.extend(saved.iter().cloned());
        Ok(saved)
    }

    async fn history(
        &self,
        profile_id: Uuid,
        recommendation_type: Option<RecommendationType>,
        limit: i64,
    ) -> AppResult<Vec<SavedRecommendation>> {
        let feedback = self.feedback.read().await;
        Ok(self
            .history
            .read()
            .await
            .iter()
            .rev()
            .filter(|r| r.profile_id == profile_id)
            .filter(|r| recommendation_type.map_or(true, |t| r.recommendation_type == t))
            .take(limit as usize)
            .map(|r| SavedRecommendation {
                feedback: feedback
                    .iter()
                    .rev()
                    .find(|(id, _)| *id == r.id)
                    .map(|(_, f)| f.clone()),
                ..r.clone()
            })
            .collect())
    }

    async fn add_feedback(
        &self,
        profile_id: Uuid,
        recommendation_id: Uuid,
        feedback: &FeedbackRequest,
    ) -> AppResult<bool> {
        let known = self
            .history
            .read()
            .await
            .iter()
            .any(|r| r.id == recommendation_id && r.profile_id == profile_id);
        if known {
            self.feedback.write().await.push((
                recommendation_id,
                FeedbackSummary {
                    liked: feedback.liked,
                    reason: feedback.reason.clone(),
                },
            ));
        }
        Ok(known)
    }

    async fn feedback_stats(&self, profile_id: Uuid) -> AppResult<FeedbackStats> {
        let history = self.history.read().await;
        let feedback = self.feedback.read().await;
        Ok(FeedbackStats::tally(feedback.iter().filter_map(|(id, f)| {
            history
                .iter()
                .find(|r| r.id == *id && r.profile_id == profile_id)
                .map(|r| (r.recommendation_type, f.liked))
        })))
    }
}

/// Model double that answers every prompt with a fixed text or error
pub struct StubModel {
    answer: Result<String, String>,
    calls: AtomicUsize,
}

impl StubModel {
    pub fn answering(text: impl Into<String>) -> Self {
        Self {
            answer: Ok(text.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            answer: Err(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(&self) -> AppResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().map_err(AppError::Upstream)
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    async fn generate(&self, _prompt: &str, _json_mode: bool) -> AppResult<String> {
        self.respond()
    }

    async fn chat(&self, _history: &[ChatMessage]) -> AppResult<String> {
        self.respond()
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

pub const KOREAN_FOOD_ANSWER: &str = r#"```json
{
  "recommendations": [
    {"name": "Bibimbap", "reason": "You rated it 5/5 and love korean food", "score": 0.95},
    {"name": "Doenjang jjigae", "reason": "A warm korean stew for a cold day", "score": 0.9, "details": "Pairs well with rice"}
  ]
}
```"#;

pub struct TestApp {
    pub server: TestServer,
    pub model: Arc<StubModel>,
    pub recommendations: Arc<InMemoryRecommendations>,
}

pub fn test_app(model: StubModel) -> TestApp {
    let model = Arc::new(model);
    let recommendations = Arc::new(InMemoryRecommendations::default());
    let state = AppState::new(
        Arc::new(InMemoryProfiles::default()),
        Arc::new(InMemoryRecords::default()),
        recommendations.clone(),
        model.clone(),
    );
    let server = TestServer::new(create_router(state)).expect("test server");

    TestApp {
        server,
        model,
        recommendations,
    }
}
