use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::distance::{Coordinate, DistanceUnit};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    pub location: Coordinate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub name: String,
    #[serde(default)]
    pub instructor: Option<String>,
    /// Minutes.
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub tier_level: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// A class session as returned by the content store.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_start_time")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub max_capacity: Option<u32>,
    #[serde(default)]
    pub activity: Option<Activity>,
    #[serde(default)]
    pub venue: Option<Venue>,
}

impl Session {
    /// `None` when the session has no start time.
    pub fn scheduled(self) -> Option<ScheduledSession> {
        let Session {
            id,
            start_time,
            status,
            max_capacity,
            activity,
            venue,
        } = self;
        Some(ScheduledSession {
            id,
            start_time: start_time?,
            status,
            max_capacity,
            activity,
            venue,
        })
    }
}

/// Unparseable timestamps are treated the same as a missing one.
fn lenient_start_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match DateTime::parse_from_rfc3339(&value) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(err) => {
            tracing::warn!(start_time = %value, error = %err, "ignoring unparseable session start time");
            None
        }
    }))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledSession {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub status: Option<String>,
    pub max_capacity: Option<u32>,
    pub activity: Option<Activity>,
    pub venue: Option<Venue>,
}

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionWithDistance {
    pub id: String,
    #[schema(value_type = String, format = "date-time", example = "2025-03-01T09:00:00Z")]
    pub start_time: DateTime<Utc>,
    pub status: Option<String>,
    pub max_capacity: Option<u32>,
    pub activity: Option<Activity>,
    pub venue: Venue,
    /// Distance from the user, in the listing's distance unit.
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct DayGroup {
    #[schema(value_type = String, format = "date", example = "2025-03-01")]
    pub date: NaiveDate,
    pub sessions: Vec<SessionWithDistance>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Category {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default)]
    pub location: Option<Coordinate>,
    #[serde(default)]
    pub search_radius: Option<f64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassesPage {
    pub days: Vec<DayGroup>,
    pub venues: Vec<Venue>,
    pub categories: Vec<Category>,
    pub booked_session_ids: Vec<String>,
    pub venue_name: Option<String>,
    pub search_query: Option<String>,
    pub active_filter_count: usize,
    pub total_sessions: usize,
    pub radius: f64,
    pub distance_unit: DistanceUnit,
}
