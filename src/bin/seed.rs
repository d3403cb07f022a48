//! Populates an empty database with a sample profile and a few records
use chrono::NaiveDate;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use life_agent_api::{
    config::Config,
    db::{
        create_pool, run_migrations, PgProfileRepository, PgRecordRepository, ProfileRepository,
        RecordRepository,
    },
    models::{CreateRecordRequest, Preferences, RecordType, Routines, UpsertProfileRequest},
};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn sample_profile() -> UpsertProfileRequest {
    UpsertProfileRequest {
        name: "Alice".to_string(),
        preferences: Some(Preferences {
            food: strings(&["korean", "italian", "japanese"]),
            travel: strings(&["nature", "city", "beach"]),
            exercise: strings(&["running", "gym", "yoga"]),
            allergies: vec![],
            dislikes: strings(&["spicy"]),
        }),
        routines: Some(Routines {
            wake_up_time: Some("07:00".to_string()),
            sleep_time: Some("23:00".to_string()),
            work_schedule: Some("09:00-18:00".to_string()),
            exercise_time: Some("morning".to_string()),
        }),
        location: Some("Seoul".to_string()),
    }
}

fn sample_records() -> Vec<CreateRecordRequest> {
    vec![
        CreateRecordRequest {
            record_type: RecordType::Food,
            title: "Pasta in Gangnam".to_string(),
            description: Some("The carbonara was excellent".to_string()),
            rating: Some(5),
            tags: strings(&["italian", "pasta", "gangnam"]),
            location: Some("Gangnam, Seoul".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 1, 15),
            metadata: Some(json!({ "price": 18000 })),
        },
        CreateRecordRequest {
            record_type: RecordType::Exercise,
            title: "Han river run 10km".to_string(),
            description: Some("Great weather for a long run".to_string()),
            rating: Some(4),
            tags: strings(&["running", "han river", "10km"]),
            location: Some("Han river park".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 1, 14),
            metadata: Some(json!({ "distanceKm": 10, "durationMinutes": 55 })),
        },
        CreateRecordRequest {
            record_type: RecordType::Travel,
            title: "Jeju Olle trail".to_string(),
            description: Some("Walked route 7 along the coast".to_string()),
            rating: Some(5),
            tags: strings(&["nature", "jeju", "hiking"]),
            location: Some("Jeju".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 1, 10),
            metadata: None,
        },
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let pool = create_pool(&config.database_url, config.database_max_connections).await?;
    run_migrations(&pool).await?;

    let profiles = PgProfileRepository::new(pool.clone());
    let records = PgRecordRepository::new(pool);

    if let Some(existing) = profiles.find_first().await? {
        tracing::info!(profile_id = %existing.id, name = %existing.name, "Profile exists, skipping seed");
        return Ok(());
    }

    let profile = profiles.upsert(&sample_profile()).await?;
    tracing::info!(profile_id = %profile.id, "Sample profile created");

    for request in sample_records() {
        let record = records.create(profile.id, &request).await?;
        tracing::info!(record_id = %record.id, title = %record.title, "Sample record created");
    }

    tracing::info!("Seeding complete");
    Ok(())
}
