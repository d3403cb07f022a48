use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::RecommendationRepository,
    error::{AppError, AppResult},
    models::{
        FeedbackRequest, FeedbackStats, FeedbackSummary, GeneratedRecommendation,
        RecommendationType, SavedRecommendation,
    },
};

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: Uuid,
    profile_id: Uuid,
    recommendation_type: String,
    name: String,
    reason: String,
    score: f64,
    details: Option<String>,
    context: Option<String>,
    created_at: DateTime<Utc>,
    feedback_liked: Option<bool>,
    feedback_reason: Option<String>,
}

impl TryFrom<HistoryRow> for SavedRecommendation {
    type Error = AppError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(SavedRecommendation {
            id: row.id,
            profile_id: row.profile_id,
            recommendation_type: row.recommendation_type.parse().map_err(AppError::Internal)?,
            name: row.name,
            reason: row.reason,
            score: row.score,
            details: row.details,
            context: row.context,
            created_at: row.created_at,
            feedback: row.feedback_liked.map(|liked| FeedbackSummary {
                liked,
                reason: row.feedback_reason,
            }),
        })
    }
}

#[derive(Clone)]
pub struct PgRecommendationRepository {
    pool: PgPool,
}

impl PgRecommendationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecommendationRepository for PgRecommendationRepository {
    async fn save_many(
        &self,
        profile_id: Uuid,
        recommendation_type: RecommendationType,
        items: &[GeneratedRecommendation],
        context: Option<String>,
    ) -> AppResult<Vec<SavedRecommendation>> {
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(items.len());

        for item in items {
            let id = Uuid::new_v4();
            let created_at: DateTime<Utc> = sqlx::query_scalar(
                r#"
                INSERT INTO recommendation_history
                    (id, profile_id, recommendation_type, name, reason, score, details, context)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING created_at
                "#,
            )
            .bind(id)
            .bind(profile_id)
            .bind(recommendation_type.as_str())
            .bind(&item.name)
            .bind(&item.reason)
            .bind(item.score)
            .bind(item.details.as_deref())
            .bind(context.as_deref())
            .fetch_one(&mut *tx)
            .await?;

            saved.push(SavedRecommendation {
                id,
                profile_id,
                recommendation_type,
                name: item.name.clone(),
                reason: item.reason.clone(),
                score: item.score,
                details: item.details.clone(),
                context: context.clone(),
                created_at,
                feedback: None,
            });
        }

        tx.commit().await?;

        Ok(saved)
    }

    async fn history(
        &self,
        profile_id: Uuid,
        recommendation_type: Option<RecommendationType>,
        limit: i64,
    ) -> AppResult<Vec<SavedRecommendation>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT h.id, h.profile_id, h.recommendation_type, h.name, h.reason, h.score,
                   h.details, h.context, h.created_at,
                   f.liked AS feedback_liked, f.reason AS feedback_reason
            FROM recommendation_history h
            LEFT JOIN LATERAL (
                SELECT liked, reason
                FROM feedback
                WHERE recommendation_id = h.id
                ORDER BY created_at DESC, seq DESC
                LIMIT 1
            ) f ON true
            WHERE h.profile_id = $1 AND ($2::text IS NULL OR h.recommendation_type = $2)
            ORDER BY h.created_at DESC, h.seq DESC
            LIMIT $3
            "#,
        )
        .bind(profile_id)
        .bind(recommendation_type.map(|t| t.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SavedRecommendation::try_from).collect()
    }

    async fn add_feedback(
        &self,
        profile_id: Uuid,
        recommendation_id: Uuid,
        feedback: &FeedbackRequest,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO feedback (id, profile_id, recommendation_id, liked, reason)
            SELECT $1, h.profile_id, h.id, $4, $5
            FROM recommendation_history h
            WHERE h.id = $3 AND h.profile_id = $2
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(profile_id)
        .bind(recommendation_id)
        .bind(feedback.liked)
        .bind(feedback.reason.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn feedback_stats(&self, profile_id: Uuid) -> AppResult<FeedbackStats> {
        let rows: Vec<(String, bool)> = sqlx::query_as(
            r#"
            SELECT h.recommendation_type, f.liked
            FROM feedback f
            JOIN recommendation_history h ON h.id = f.recommendation_id
            WHERE f.profile_id = $1
            "#,
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        let pairs = rows
            .into_iter()
            .map(|(recommendation_type, liked)| {
                recommendation_type
                    .parse::<RecommendationType>()
                    .map(|t| (t, liked))
                    .map_err(AppError::Internal)
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(FeedbackStats::tally(pairs))
    }
}
