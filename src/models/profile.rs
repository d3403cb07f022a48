use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;
use validator::Validate;

/// The single user's identity, preferences and routines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub preferences: Preferences,
    pub routines: Routines,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Preference tag lists, stored one row per (category, value)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preferences {
    #[serde(default)]
    pub food: Vec<String>,
    #[serde(default)]
    pub travel: Vec<String>,
    #[serde(default)]
    pub exercise: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceCategory {
    Food,
    Travel,
    Exercise,
    Allergies,
    Dislikes,
}

impl PreferenceCategory {
    pub const ALL: [PreferenceCategory; 5] = [
        PreferenceCategory::Food,
        PreferenceCategory::Travel,
        PreferenceCategory::Exercise,
        PreferenceCategory::Allergies,
        PreferenceCategory::Dislikes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceCategory::Food => "food",
            PreferenceCategory::Travel => "travel",
            PreferenceCategory::Exercise => "exercise",
            PreferenceCategory::Allergies => "allergies",
            PreferenceCategory::Dislikes => "dislikes",
        }
    }
}

impl Display for PreferenceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreferenceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PreferenceCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown preference category '{}'", s))
    }
}

impl Preferences {
    pub fn get(&self, category: PreferenceCategory) -> &[String] {
        match category {
            PreferenceCategory::Food => &self.food,
            PreferenceCategory::Travel => &self.travel,
            PreferenceCategory::Exercise => &self.exercise,
            PreferenceCategory::Allergies => &self.allergies,
            PreferenceCategory::Dislikes => &self.dislikes,
        }
    }

    fn get_mut(&mut self, category: PreferenceCategory) -> &mut Vec<String> {
        match category {
            PreferenceCategory::Food => &mut self.food,
            PreferenceCategory::Travel => &mut self.travel,
            PreferenceCategory::Exercise => &mut self.exercise,
            PreferenceCategory::Allergies => &mut self.allergies,
            PreferenceCategory::Dislikes => &mut self.dislikes,
        }
    }

    /// Rebuilds the lists from stored (category, value) rows.
    ///
    /// Rows with an unknown category are skipped.
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = (S, String)>,
        S: AsRef<str>,
    {
        let mut preferences = Preferences::default();
        for (category, value) in rows {
            match category.as_ref().parse::<PreferenceCategory>() {
                Ok(category) => preferences.get_mut(category).push(value),
                Err(e) => tracing::warn!(error = %e, "Skipping stored preference"),
            }
        }
        preferences
    }

    /// A patch that replaces every category
    pub fn as_patch(&self) -> PreferencesPatch {
        PreferencesPatch {
            food: Some(self.food.clone()),
            travel: Some(self.travel.clone()),
            exercise: Some(self.exercise.clone()),
            allergies: Some(self.allergies.clone()),
            dislikes: Some(self.dislikes.clone()),
        }
    }
}

/// Partial preference update: only the categories present are replaced
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct PreferencesPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dislikes: Option<Vec<String>>,
}

impl PreferencesPatch {
    /// Categories carried by this patch, in canonical order
    pub fn entries(&self) -> impl Iterator<Item = (PreferenceCategory, &[String])> + '_ {
        PreferenceCategory::ALL.into_iter().filter_map(move |category| {
            let values = match category {
                PreferenceCategory::Food => &self.food,
                PreferenceCategory::Travel => &self.travel,
                PreferenceCategory::Exercise => &self.exercise,
                PreferenceCategory::Allergies => &self.allergies,
                PreferenceCategory::Dislikes => &self.dislikes,
            };
            values.as_deref().map(|v| (category, v))
        })
    }

    pub fn apply_to(&self, preferences: &mut Preferences) {
        for (category, values) in self.entries() {
            *preferences.get_mut(category) = values.to_vec();
        }
    }
}

/// Daily routine times, free-form strings such as "07:00"
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Routines {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wake_up_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_time: Option<String>,
}

impl Routines {
    /// Overwrites only the fields set in `patch`
    pub fn merge(&mut self, patch: &Routines) {
        if patch.wake_up_time.is_some() {
            self.wake_up_time.clone_from(&patch.wake_up_time);
        }
        if patch.sleep_time.is_some() {
            self.sleep_time.clone_from(&patch.sleep_time);
        }
        if patch.work_schedule.is_some() {
            self.work_schedule.clone_from(&patch.work_schedule);
        }
        if patch.exercise_time.is_some() {
            self.exercise_time.clone_from(&patch.exercise_time);
        }
    }
}

/// Body of `POST /api/profile`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct UpsertProfileRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routines: Option<Routines>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}
