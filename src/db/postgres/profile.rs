use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    db::ProfileRepository,
    error::{AppError, AppResult},
    models::{Preferences, PreferencesPatch, Profile, Routines, UpsertProfileRequest},
};

const SELECT_PROFILE: &str = "SELECT id, name, location, created_at, updated_at FROM profiles";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    name: String,
    location: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct RoutineRow {
    wake_up_time: Option<String>,
    sleep_time: Option<String>,
    work_schedule: Option<String>,
    exercise_time: Option<String>,
}

impl From<RoutineRow> for Routines {
    fn from(row: RoutineRow) -> Self {
        Routines {
            wake_up_time: row.wake_up_time,
            sleep_time: row.sleep_time,
            work_schedule: row.work_schedule,
            exercise_time: row.exercise_time,
        }
    }
}

/// How a routines write treats fields absent from the input
#[derive(Clone, Copy)]
enum RoutineWrite {
    Replace,
    Merge,
}

#[derive(Clone)]
pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads preferences and routines for a profile row
    async fn hydrate(conn: &mut PgConnection, row: ProfileRow) -> AppResult<Profile> {
        let preference_rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT category, value FROM preferences WHERE profile_id = $1 ORDER BY id",
        )
        .bind(row.id)
        .fetch_all(&mut *conn)
        .await?;

        let routines = sqlx::query_as::<_, RoutineRow>(
            r#"
            SELECT wake_up_time, sleep_time, work_schedule, exercise_time
            FROM routines
            WHERE profile_id = $1
            "#,
        )
        .bind(row.id)
        .fetch_optional(&mut *conn)
        .await?
        .map(Routines::from)
        .unwrap_or_default();

        Ok(Profile {
            id: row.id,
            name: row.name,
            location: row.location,
            preferences: Preferences::from_rows(preference_rows),
            routines,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn replace_preferences(
        conn: &mut PgConnection,
        profile_id: Uuid,
        patch: &PreferencesPatch,
    ) -> AppResult<()> {
        for (category, values) in patch.entries() {
            sqlx::query("DELETE FROM preferences WHERE profile_id = $1 AND category = $2")
                .bind(profile_id)
                .bind(category.as_str())
                .execute(&mut *conn)
                .await?;

            if values.is_empty() {
                continue;
            }

            sqlx::query(
                r#"
                INSERT INTO preferences (profile_id, category, value)
                SELECT $1, $2, t.value
                FROM unnest($3::text[]) WITH ORDINALITY AS t(value, n)
                ORDER BY t.n
                "#,
            )
            .bind(profile_id)
            .bind(category.as_str())
            .bind(values)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    async fn write_routines(
        conn: &mut PgConnection,
        profile_id: Uuid,
        routines: &Routines,
        mode: RoutineWrite,
    ) -> AppResult<()> {
        let sql = match mode {
            RoutineWrite::Replace => {
                r#"
                INSERT INTO routines (profile_id, wake_up_time, sleep_time, work_schedule, exercise_time)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (profile_id) DO UPDATE SET
                    wake_up_time = EXCLUDED.wake_up_time,
                    sleep_time = EXCLUDED.sleep_time,
                    work_schedule = EXCLUDED.work_schedule,
                    exercise_time = EXCLUDED.exercise_time
                "#
            }
            RoutineWrite::Merge => {
                r#"
                INSERT INTO routines (profile_id, wake_up_time, sleep_time, work_schedule, exercise_time)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (profile_id) DO UPDATE SET
                    wake_up_time = COALESCE(EXCLUDED.wake_up_time, routines.wake_up_time),
                    sleep_time = COALESCE(EXCLUDED.sleep_time, routines.sleep_time),
                    work_schedule = COALESCE(EXCLUDED.work_schedule, routines.work_schedule),
                    exercise_time = COALESCE(EXCLUDED.exercise_time, routines.exercise_time)
                "#
            }
        };

        sqlx::query(sql)
            .bind(profile_id)
            .bind(routines.wake_up_time.as_deref())
            .bind(routines.sleep_time.as_deref())
            .bind(routines.work_schedule.as_deref())
            .bind(routines.exercise_time.as_deref())
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Bumps `updated_at`; fails with NotFound for an unknown profile
    async fn touch(conn: &mut PgConnection, profile_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("UPDATE profiles SET updated_at = now() WHERE id = $1")
            .bind(profile_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Profile {} not found", profile_id)));
        }
        Ok(())
    }

    async fn load(&self, id: Uuid) -> AppResult<Profile> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", id)))
    }
}

#[async_trait::async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn find_first(&self) -> AppResult<Option<Profile>> {
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "{} ORDER BY created_at, id LIMIT 1",
            SELECT_PROFILE
        ))
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::hydrate(&mut conn, row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Profile>> {
        let mut conn = self.pool.acquire().await?;

        let row = sqlx::query_as::<_, ProfileRow>(&format!("{} WHERE id = $1", SELECT_PROFILE))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match row {
            Some(row) => Ok(Some(Self::hydrate(&mut conn, row).await?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, request: &UpsertProfileRequest) -> AppResult<Profile> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM profiles ORDER BY created_at, id LIMIT 1 FOR UPDATE",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let profile_id = match existing {
            Some(id) => {
                sqlx::query(
                    "UPDATE profiles SET name = $2, location = $3, updated_at = now() WHERE id = $1",
                )
                .bind(id)
                .bind(&request.name)
                .bind(request.location.as_deref())
                .execute(&mut *tx)
                .await?;
                id
            }
            None => {
                let id = Uuid::new_v4();
                sqlx::query("INSERT INTO profiles (id, name, location) VALUES ($1, $2, $3)")
                    .bind(id)
                    .bind(&request.name)
                    .bind(request.location.as_deref())
                    .execute(&mut *tx)
                    .await?;
                id
            }
        };

        if let Some(preferences) = &request.preferences {
            Self::replace_preferences(&mut tx, profile_id, &preferences.as_patch()).await?;
        }

        if let Some(routines) = &request.routines {
            Self::write_routines(&mut tx, profile_id, routines, RoutineWrite::Replace).await?;
        }

        tx.commit().await?;

        tracing::debug!(profile_id = %profile_id, created = existing.is_none(), "Profile upserted");

        self.load(profile_id).await
    }

    async fn update_preferences(
        &self,
        profile_id: Uuid,
        patch: &PreferencesPatch,
    ) -> AppResult<Profile> {
        let mut tx = self.pool.begin().await?;
        Self::touch(&mut tx, profile_id).await?;
        Self::replace_preferences(&mut tx, profile_id, patch).await?;
        tx.commit().await?;

        self.load(profile_id).await
    }

    async fn update_routines(&self, profile_id: Uuid, patch: &Routines) -> AppResult<Profile> {
        let mut tx = self.pool.begin().await?;
        Self::touch(&mut tx, profile_id).await?;
        Self::write_routines(&mut tx, profile_id, patch, RoutineWrite::Merge).await?;
        tx.commit().await?;

        self.load(profile_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn alice() -> UpsertProfileRequest {
        UpsertProfileRequest {
            name: "Alice".to_string(),
            preferences: Some(Preferences {
                food: strings(&["korean", "italian", "japanese"]),
                travel: strings(&["nature"]),
                ..Default::default()
            }),
            routines: Some(Routines {
                wake_up_time: Some("07:00".to_string()),
                sleep_time: Some("23:00".to_string()),
                ..Default::default()
            }),
            location: Some("Seoul".to_string()),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_upsert_round_trip_keeps_preference_order(pool: PgPool) {
        let repo = PgProfileRepository::new(pool);

        let created = repo.upsert(&alice()).await.unwrap();
        let loaded = repo.find_first().await.unwrap().unwrap();

        assert_eq!(loaded, created);
        assert_eq!(loaded.preferences.food, strings(&["korean", "italian", "japanese"]));
        assert_eq!(loaded.routines.wake_up_time.as_deref(), Some("07:00"));
        assert_eq!(loaded.location.as_deref(), Some("Seoul"));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_second_upsert_updates_same_profile(pool: PgPool) {
        let repo = PgProfileRepository::new(pool);
        let first = repo.upsert(&alice()).await.unwrap();

        let second = repo
            .upsert(&UpsertProfileRequest {
                name: "Alice Kim".to_string(),
                preferences: None,
                routines: None,
                location: None,
            })
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.name, "Alice Kim");
        assert_eq!(second.location, None);
        assert_eq!(second.preferences, first.preferences);
        assert_eq!(second.routines, first.routines);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_update_routines_merges_absent_fields(pool: PgPool) {
        let repo = PgProfileRepository::new(pool);
        let profile = repo.upsert(&alice()).await.unwrap();

        let updated = repo
            .update_routines(
                profile.id,
                &Routines {
                    exercise_time: Some("18:00".to_string()),
                    sleep_time: Some("22:30".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.routines.wake_up_time.as_deref(), Some("07:00"));
        assert_eq!(updated.routines.sleep_time.as_deref(), Some("22:30"));
        assert_eq!(updated.routines.exercise_time.as_deref(), Some("18:00"));
        assert_eq!(updated.routines.work_schedule, None);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_update_preferences_replaces_only_given_categories(pool: PgPool) {
        let repo = PgProfileRepository::new(pool);
        let profile = repo.upsert(&alice()).await.unwrap();

        let updated = repo
            .update_preferences(
                profile.id,
                &PreferencesPatch {
                    travel: Some(strings(&["city", "beach"])),
                    allergies: Some(strings(&["peanut"])),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.preferences.travel, strings(&["city", "beach"]));
        assert_eq!(updated.preferences.allergies, strings(&["peanut"]));
        assert_eq!(updated.preferences.food, strings(&["korean", "italian", "japanese"]));
        assert!(updated.updated_at >= profile.updated_at);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires a PostgreSQL database (DATABASE_URL)"]
    async fn test_update_unknown_profile_is_not_found(pool: PgPool) {
        let repo = PgProfileRepository::new(pool);

        let err = repo
            .update_routines(Uuid::new_v4(), &Routines::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
