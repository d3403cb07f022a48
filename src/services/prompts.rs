use crate::models::{LifeRecord, Profile, RecommendationType};

/// How many recent records are quoted in a recommendation prompt
pub const PROMPT_RECORD_LIMIT: usize = 5;

const NOT_SET: &str = "not set";
const NONE: &str = "none";

fn list_or(values: &[String], placeholder: &str) -> String {
    if values.is_empty() {
        placeholder.to_string()
    } else {
        values.join(", ")
    }
}

fn or_not_set(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or(NOT_SET)
}

fn rating_label(record: &LifeRecord) -> String {
    match record.rating {
        Some(rating) => format!("{}/5", rating),
        None => "no rating".to_string(),
    }
}

/// Describes the user to the model
///
/// `location` overrides the profile's own location when given.
pub fn build_profile_context(profile: &Profile, location: Option<&str>) -> String {
    let prefs = &profile.preferences;
    let routines = &profile.routines;
    let location = location.or(profile.location.as_deref());

    format!(
        "You are a personal life agent. You give recommendations tailored to the user's \
tastes and routines.

## User
- Name: {name}
- Location: {location}

## Food
- Likes: {food}
- Allergies / must avoid: {allergies}
- Dislikes: {dislikes}

## Travel
- Preferred styles: {travel}

## Exercise
- Likes: {exercise}

## Daily routine
- Wake-up time: {wake}
- Bedtime: {sleep}
- Exercise time: {exercise_time}

Always be friendly and personal. Explain each recommendation in terms of the user's tastes.",
        name = profile.name,
        location = or_not_set(location),
        food = list_or(&prefs.food, NOT_SET),
        allergies = list_or(&prefs.allergies, NONE),
        dislikes = list_or(&prefs.dislikes, NONE),
        travel = list_or(&prefs.travel, NOT_SET),
        exercise = list_or(&prefs.exercise, NOT_SET),
        wake = or_not_set(routines.wake_up_time.as_deref()),
        sleep = or_not_set(routines.sleep_time.as_deref()),
        exercise_time = or_not_set(routines.exercise_time.as_deref()),
    )
}

/// Builds the instruction for a recommendation request
///
/// Only the first [`PROMPT_RECORD_LIMIT`] of `recent_records` are quoted.
pub fn build_recommendation_prompt(
    recommendation_type: RecommendationType,
    profile: &Profile,
    context: Option<&str>,
    location: Option<&str>,
    recent_records: &[LifeRecord],
) -> String {
    let label = recommendation_type.label();
    let mut prompt = build_profile_context(profile, location);

    prompt.push_str(&format!("\n\n## Request\nRecommend {} for the user.", label));

    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str(&format!("\n\n## Additional context\n{}", context));
    }

    if !recent_records.is_empty() {
        prompt.push_str(&format!("\n\n## Recent {} records", label));
        for record in recent_records.iter().take(PROMPT_RECORD_LIMIT) {
            prompt.push_str(&format!(
                "\n- {} ({}, {})",
                record.title,
                rating_label(record),
                record.date
            ));
        }
    }

    prompt.push_str(
        r#"

## Response format
Provide 3-5 recommendations as a JSON object of this shape:
{
  "recommendations": [
    {
      "name": "recommendation name",
      "reason": "why it fits the user's tastes",
      "score": 0.95,
      "details": "optional details"
    }
  ]
}"#,
    );

    prompt
}

/// Builds the instruction for taste-pattern analysis over the record log
pub fn build_analysis_prompt(profile: &Profile, records: &[LifeRecord]) -> String {
    let mut prompt = build_profile_context(profile, None);

    prompt.push_str("\n\n## Analysis request\nAnalyse the user's records and identify their taste patterns.\n\n## Records");
    for record in records {
        prompt.push_str(&format!(
            "\n- [{}] {}: {} ({})",
            record.record_type,
            record.title,
            record.description.as_deref().unwrap_or("no description"),
            rating_label(record)
        ));
    }

    prompt.push_str(
        r#"

## Response format
{
  "patterns": {
    "food": ["food taste patterns found"],
    "travel": ["travel style patterns found"],
    "exercise": ["exercise patterns found"]
  },
  "suggestions": ["preferences worth adding to the profile"],
  "insights": "overall summary"
}"#,
    );

    prompt
}

/// Builds the instruction that turns one piece of feedback into a tuning hint
pub fn build_feedback_prompt(recommendation: &str, liked: bool, reason: Option<&str>) -> String {
    let verdict = if liked { "liked" } else { "disliked" };
    let mut prompt = format!("The user marked \"{}\" as {}.", recommendation, verdict);

    if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
        prompt.push_str(&format!("\nReason: {}", reason));
    }

    prompt.push_str(
        r#"

Analyse this feedback and explain how future recommendations should change.

## Response format
{
  "adjustment": "how to adjust future recommendations",
  "avoid": ["things to avoid"],
  "prefer": ["things to prefer"],
  "note": "short note for the user"
}"#,
    );

    prompt
}

/// Opening turn that primes a chat with who the agent is talking to
pub fn chat_system_context(profile: &Profile) -> String {
    format!(
        "You are the personal life agent of \"{}\". You chat with them and give tailored \
food, travel and exercise recommendations. Always reply in a friendly, personal tone.",
        profile.name
    )
}

pub fn chat_greeting(profile: &Profile) -> String {
    format!("Hi {}! How can I help you today?", profile.name)
}
