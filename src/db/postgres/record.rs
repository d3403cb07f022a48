use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    db::RecordRepository,
    error::{AppError, AppResult},
    models::{
        CreateRecordRequest, LifeRecord, RecordPage, RecordQuery, RecordStats,
        UpdateRecordRequest,
    },
};

const SELECT_RECORD: &str = r#"
    SELECT r.id, r.record_type, r.title, r.description, r.rating, r.location, r.date,
           r.metadata, r.created_at, r.updated_at,
           ARRAY(SELECT t.tag FROM record_tags t WHERE t.record_id = r.id ORDER BY t.position) AS tags
    FROM records r
"#;

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: Uuid,
    record_type: String,
    title: String,
    description: Option<String>,
    rating: Option<i16>,
    location: Option<String>,
    date: NaiveDate,
    metadata: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    tags: Vec<String>,
}

impl TryFrom<RecordRow> for LifeRecord {
    type Error = AppError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        Ok(LifeRecord {
            id: row.id,
            record_type: row.record_type.parse().map_err(AppError::Internal)?,
            title: row.title,
            description: row.description,
            rating: row.rating,
            tags: row.tags,
            location: row.location,
            date: row.date,
            metadata: row.metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgRecordRepository {
    pool: PgPool,
}

impl PgRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_tags(conn: &mut PgConnection, record_id: Uuid, tags: &[String]) -> AppResult<()> {
        if tags.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO record_tags (record_id, position, tag)
            SELECT $1, t.n::int, t.tag
            FROM unnest($2::text[]) WITH ORDINALITY AS t(tag, n)
            "#,
        )
        .bind(record_id)
        .bind(tags)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    async fn fetch(
        conn: &mut PgConnection,
        profile_id: Uuid,
        id: Uuid,
    ) -> AppResult<Option<LifeRecord>> {
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            "{} WHERE r.id = $1 AND r.profile_id = $2",
            SELECT_RECORD
        ))
        .bind(id)
        .bind(profile_id)
        .fetch_optional(&mut *conn)
        .await?;

        row.map(LifeRecord::try_from).transpose()
    }
}

#[async_trait::async_trait]
impl RecordRepository for PgRecordRepository {
    async fn find_by_id(&self, profile_id: Uuid, id: Uuid) -> AppResult<Option<LifeRecord>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, profile_id, id).await
    }

    async fn list(&self, profile_id: Uuid, query: &RecordQuery) -> AppResult<RecordPage> {
        let record_type = query.record_type.map(|t| t.as_str());

        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            r#"{}
            WHERE r.profile_id = $1 AND ($2::text IS NULL OR r.record_type = $2)
            ORDER BY r.date DESC, r.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            SELECT_RECORD
        ))
        .bind(profile_id)
        .bind(record_type)
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM records WHERE profile_id = $1 AND ($2::text IS NULL OR record_type = $2)",
        )
        .bind(profile_id)
        .bind(record_type)
        .fetch_one(&self.pool)
        .await?;

        let records = rows
            .into_iter()
            .map(LifeRecord::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(RecordPage { records, total })
    }

    async fn create(
        &self,
        profile_id: Uuid,
        request: &CreateRecordRequest,
    ) -> AppResult<LifeRecord> {
        let id = Uuid::new_v4();
        let date = request.date.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO records
                (id, profile_id, record_type, title, description, rating, location, date, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(profile_id)
        .bind(request.record_type.as_str())
        .bind(&request.title)
        .bind(request.description.as_deref())
        .bind(request.rating)
        .bind(request.location.as_deref())
        .bind(date)
        .bind(request.metadata.as_ref())
        .execute(&mut *tx)
        .await?;

        Self::insert_tags(&mut tx, id, &request.tags).await?;

        let record = Self::fetch(&mut tx, profile_id, id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Record {} vanished after insert", id)))?;

        tx.commit().await?;

        tracing::debug!(record_id = %id, record_type = %request.record_type, "Record created");

        Ok(record)
    }

    async fn update(
        &self,
        profile_id: Uuid,
        id: Uuid,
        request: &UpdateRecordRequest,
    ) -> AppResult<Option<LifeRecord>> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE records SET
                record_type = COALESCE($3, record_type),
                title = COALESCE($4, title),
                description = COALESCE($5, description),
                rating = COALESCE($6, rating),
                location = COALESCE($7, location),
                date = COALESCE($8, date),
                metadata = COALESCE($9, metadata),
                updated_at = now()
            WHERE id = $1 AND profile_id = $2
            "#,
        )
        .bind(id)
        .bind(profile_id)
        .bind(request.record_type.map(|t| t.as_str()))
        .bind(request.title.as_deref())
        .bind(request.description.as_deref())
        .bind(request.rating)
        .bind(request.location.as_deref())
        .bind(request.date)
        .bind(request.metadata.as_ref())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        if let Some(tags) = &request.tags {
            sqlx::query("DELETE FROM record_tags WHERE record_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::insert_tags(&mut tx, id, tags).await?;
        }

        let record = Self::fetch(&mut tx, profile_id, id).await?;
        tx.commit().await?;

        Ok(record)
    }

    async fn delete(&self, profile_id: Uuid, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM records WHERE id = $1 AND profile_id = $2")
            .bind(id)
            .bind(profile_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn stats(&self, profile_id: Uuid) -> AppResult<RecordStats> {
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            "{} WHERE r.profile_id = $1 ORDER BY r.date DESC, r.created_at DESC",
            SELECT_RECORD
        ))
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .into_iter()
            .map(LifeRecord::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(RecordStats::from_records(&records))
    }
}
