use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt::Display, str::FromStr};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Number of tags reported by [`RecordStats`]
pub const TOP_TAGS: usize = 10;
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Kind of logged life event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Food,
    Travel,
    Exercise,
    Other,
}

impl RecordType {
    pub const ALL: [RecordType; 4] = [
        RecordType::Food,
        RecordType::Travel,
        RecordType::Exercise,
        RecordType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Food => "food",
            RecordType::Travel => "travel",
            RecordType::Exercise => "exercise",
            RecordType::Other => "other",
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown record type '{}'", s))
    }
}

/// A logged personal event (meal, trip, workout, other)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LifeRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// 1 to 5 when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i16>,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn validate_metadata(metadata: &serde_json::Value) -> Result<(), ValidationError> {
    if metadata.is_object() {
        Ok(())
    } else {
        Err(ValidationError::new("metadata_not_object")
            .with_message("Metadata must be a JSON object".into()))
    }
}

/// Body of `POST /api/records`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct CreateRecordRequest {
    #[serde(rename = "type")]
    pub record_type: RecordType,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i16>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Defaults to today when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_metadata"))]
    pub metadata: Option<serde_json::Value>,
}

/// Body of `PATCH /api/records/:id`; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
pub struct UpdateRecordRequest {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<RecordType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_metadata"))]
    pub metadata: Option<serde_json::Value>,
}

impl UpdateRecordRequest {
    /// Applies the patch to an in-memory record
    pub fn apply_to(&self, record: &mut LifeRecord) {
        if let Some(record_type) = self.record_type {
            record.record_type = record_type;
        }
        if let Some(title) = &self.title {
            record.title.clone_from(title);
        }
        if self.description.is_some() {
            record.description.clone_from(&self.description);
        }
        if self.rating.is_some() {
            record.rating = self.rating;
        }
        if let Some(tags) = &self.tags {
            record.tags.clone_from(tags);
        }
        if self.location.is_some() {
            record.location.clone_from(&self.location);
        }
        if let Some(date) = self.date {
            record.date = date;
        }
        if self.metadata.is_some() {
            record.metadata.clone_from(&self.metadata);
        }
    }
}

/// Query string of `GET /api/records`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordQuery {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<RecordType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

impl RecordQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// One page of records plus the unpaginated total
#[derive(Debug, Clone)]
pub struct RecordPage {
    pub records: Vec<LifeRecord>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordListResponse {
    pub records: Vec<LifeRecord>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordTypeCounts {
    pub food: usize,
    pub travel: usize,
    pub exercise: usize,
    pub other: usize,
}

impl RecordTypeCounts {
    fn increment(&mut self, record_type: RecordType) {
        match record_type {
            RecordType::Food => self.food += 1,
            RecordType::Travel => self.travel += 1,
            RecordType::Exercise => self.exercise += 1,
            RecordType::Other => self.other += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Aggregates over every record of a profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordStats {
    pub total_records: usize,
    pub by_type: RecordTypeCounts,
    pub top_tags: Vec<TagCount>,
    /// Mean over rated records, 0 when none are rated
    pub average_rating: f64,
}

impl RecordStats {
    pub fn from_records(records: &[LifeRecord]) -> Self {
        let mut by_type = RecordTypeCounts::default();
        let mut tag_counts: Vec<TagCount> = Vec::new();
        let mut tag_index: HashMap<&str, usize> = HashMap::new();
        let mut rating_sum = 0i64;
        let mut rated = 0i64;

        for record in records {
            by_type.increment(record.record_type);

            if let Some(rating) = record.rating {
                rating_sum += i64::from(rating);
                rated += 1;
            }

            for tag in &record.tags {
                match tag_index.get(tag.as_str()) {
                    Some(&i) => tag_counts[i].count += 1,
                    None => {
                        tag_index.insert(tag, tag_counts.len());
                        tag_counts.push(TagCount {
                            tag: tag.clone(),
                            count: 1,
                        });
                    }
                }
            }
        }

        // Stable sort: equal counts keep first-encountered order
        tag_counts.sort_by(|a, b| b.count.cmp(&a.count));
        tag_counts.truncate(TOP_TAGS);

        let average_rating = if rated > 0 {
            rating_sum as f64 / rated as f64
        } else {
            0.0
        };

        Self {
            total_records: records.len(),
            by_type,
            top_tags: tag_counts,
            average_rating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(record_type: RecordType, rating: Option<i16>, tags: &[&str]) -> LifeRecord {
        let now = Utc::now();
        LifeRecord {
            id: Uuid::new_v4(),
            record_type,
            title: "test".to_string(),
            description: None,
            rating,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            location: None,
            date: now.date_naive(),
            metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_average_rating_ignores_unrated() {
        let records = vec![
            record(RecordType::Food, Some(5), &[]),
            record(RecordType::Food, Some(4), &[]),
            record(RecordType::Travel, None, &[]),
        ];
        let stats = RecordStats::from_records(&records);
        assert_eq!(stats.average_rating, 4.5);
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.by_type.food, 2);
        assert_eq!(stats.by_type.travel, 1);
        assert_eq!(stats.by_type.other, 0);
    }

    #[test]
    fn test_average_rating_zero_without_ratings() {
        let stats = RecordStats::from_records(&[record(RecordType::Other, None, &["x"])]);
        assert_eq!(stats.average_rating, 0.0);
    }

    #[test]
    fn test_top_tags_ordered_by_count() {
        let records = vec![
            record(RecordType::Food, None, &["c", "a", "b"]),
            record(RecordType::Food, None, &["a", "b"]),
            record(RecordType::Food, None, &["b", "a"]),
        ];
        let stats = RecordStats::from_records(&records);
        let tags: Vec<_> = stats.top_tags.iter().map(|t| t.tag.as_str()).collect();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[2], "c");
        assert!(tags[..2].contains(&"a") && tags[..2].contains(&"b"));
        assert_eq!(stats.top_tags[0].count, 3);
        assert_eq!(stats.top_tags[2].count, 1);
    }

    #[test]
    fn test_top_tags_capped_at_ten() {
        let tags: Vec<String> = (0..15).map(|i| format!("tag{}", i)).collect();
        let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        let stats = RecordStats::from_records(&[record(RecordType::Exercise, None, &tag_refs)]);
        assert_eq!(stats.top_tags.len(), TOP_TAGS);
        assert_eq!(stats.top_tags[0].tag, "tag0");
    }

    #[test]
    fn test_rating_out_of_range_fails_validation() {
        for rating in [0, 6] {
            let request = CreateRecordRequest {
                record_type: RecordType::Food,
                title: "Bibimbap".to_string(),
                description: None,
                rating: Some(rating),
                tags: vec![],
                location: None,
                date: None,
                metadata: None,
            };
            assert!(request.validate().is_err(), "rating {} accepted", rating);
        }
    }

    #[test]
    fn test_metadata_must_be_object() {
        let request: CreateRecordRequest = serde_json::from_value(serde_json::json!({
            "type": "food",
            "title": "Bibimbap",
            "metadata": [1, 2, 3]
        }))
        .unwrap();
        assert!(request.validate().is_err());

        let request: CreateRecordRequest = serde_json::from_value(serde_json::json!({
            "type": "food",
            "title": "Bibimbap",
            "rating": 5,
            "date": "2024-01-15",
            "metadata": { "restaurant": "Gogung" }
        }))
        .unwrap();
        assert!(request.validate().is_ok());
        assert_eq!(request.date, NaiveDate::from_ymd_opt(2024, 1, 15));
    }

    #[test]
    fn test_query_limits_are_bounded() {
        let query = RecordQuery {
            record_type: None,
            limit: Some(1000),
            offset: Some(-5),
        };
        assert_eq!(query.limit(), MAX_PAGE_SIZE);
        assert_eq!(query.offset(), 0);
        assert_eq!(RecordQuery::default().limit(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_update_applies_present_fields_only() {
        let mut rec = record(RecordType::Food, Some(3), &["old"]);
        let patch = UpdateRecordRequest {
            rating: Some(5),
            tags: Some(vec!["new".to_string()]),
            ..Default::default()
        };
        patch.apply_to(&mut rec);
        assert_eq!(rec.rating, Some(5));
        assert_eq!(rec.tags, vec!["new"]);
        assert_eq!(rec.title, "test");
    }
}
