use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::distance::BoundingBox;
use crate::models::{Category, Session, UserPreferences};

const SESSION_PROJECTION: &str = r#"{
  _id,
  startTime,
  status,
  maxCapacity,
  "activity": activity->{ name, instructor, duration, tierLevel, "category": category->name },
  "venue": venue->{ _id, name, "city": address.city, "location": { "lat": address.lat, "lng": address.lng } }
}"#;

const IN_BOUNDING_BOX: &str = "venue->address.lat >= $minLat && venue->address.lat <= $maxLat \
  && venue->address.lng >= $minLng && venue->address.lng <= $maxLng";

pub const CATEGORIES_QUERY: &str =
    r#"*[_type == "category"] | order(name asc) { _id, name, "slug": slug.current }"#;

pub const VENUE_NAME_BY_ID_QUERY: &str = r#"*[_type == "venue" && _id == $venueId][0] { name }"#;

pub const USER_BOOKED_SESSION_IDS_QUERY: &str = r#"*[_type == "booking"
  && user->clerkId == $clerkId
  && status == "confirmed"
].classSession._ref"#;

pub const USER_PREFERENCES_QUERY: &str =
    r#"*[_type == "userProfile" && clerkId == $clerkId][0] { location, searchRadius }"#;

pub fn filtered_sessions_query() -> String {
    format!(
        r#"*[_type == "classSession"
  && startTime > now()
  && status == "scheduled"
  && ($venueId == "" || venue._ref == $venueId)
  && (count($categoryIds) == 0 || activity->category._ref in $categoryIds)
  && (count($tierLevels) == 0 || activity->tierLevel in $tierLevels)
  && {IN_BOUNDING_BOX}
] | order(startTime asc) {SESSION_PROJECTION}"#
    )
}

pub fn search_sessions_query() -> String {
    format!(
        r#"*[_type == "classSession"
  && startTime > now()
  && status == "scheduled"
  && (activity->name match $searchTerm + "*" || venue->name match $searchTerm + "*")
  && {IN_BOUNDING_BOX}
] | order(startTime asc) {SESSION_PROJECTION}"#
    )
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Content store base URL cannot be used as a query endpoint: {0}")]
    InvalidBaseUrl(Url),
}

/// What the listing page asks the content store for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionQuery {
    pub search_term: Option<String>,
    pub venue_id: Option<String>,
    pub category_ids: Vec<String>,
    pub tier_levels: Vec<String>,
    pub bounds: Option<BoundingBox>,
}

impl SessionQuery {
    fn groq(&self) -> (String, Vec<(&'static str, Value)>) {
        let bounds = self.bounds.unwrap_or(BoundingBox {
            min_lat: -90.0,
            max_lat: 90.0,
            min_lng: -180.0,
            max_lng: 180.0,
        });
        let mut params = vec![
            ("minLat", json!(bounds.min_lat)),
            ("maxLat", json!(bounds.max_lat)),
            ("minLng", json!(bounds.min_lng)),
            ("maxLng", json!(bounds.max_lng)),
        ];

        match &self.search_term {
            Some(term) => {
                params.push(("searchTerm", json!(term)));
                (search_sessions_query(), params)
            }
            None => {
                params.push(("venueId", json!(self.venue_id.clone().unwrap_or_default())));
                params.push(("categoryIds", json!(self.category_ids)));
                params.push(("tierLevels", json!(self.tier_levels)));
                (filtered_sessions_query(), params)
            }
        }
    }
}

#[derive(Deserialize)]
struct QueryResponse<T> {
    result: T,
}

/// Decode each record on its own so one incomplete document only drops itself.
fn decode_records<T: DeserializeOwned>(kind: &str, records: Option<Vec<Value>>) -> Vec<T> {
    records
        .unwrap_or_default()
        .into_iter()
        .filter_map(|record| {
            let id = record.get("_id").and_then(Value::as_str).map(str::to_string);
            serde_json::from_value(record)
                .map_err(|err| warn!(kind, id = ?id, error = %err, "skipping malformed content record"))
                .ok()
        })
        .collect()
}

#[derive(Deserialize)]
struct VenueName {
    name: Option<String>,
}

/// Read client for the hosted content store's GROQ query endpoint.
#[derive(Clone)]
pub struct ContentClient {
    client: reqwest::Client,
    query_url: Arc<Url>,
    token: Option<String>,
}

impl ContentClient {
    pub fn new(
        base_url: &Url,
        api_version: &str,
        dataset: &str,
        token: Option<String>,
    ) -> Result<Self, ContentError> {
        let mut query_url = base_url.clone();
        query_url
            .path_segments_mut()
            .map_err(|_| ContentError::InvalidBaseUrl(base_url.clone()))?
            .pop_if_empty()
            .push(&format!("v{}", api_version.trim_start_matches('v')))
            .extend(["data", "query", dataset]);

        Ok(Self {
            client: reqwest::Client::new(),
            query_url: Arc::new(query_url),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn query_url(&self) -> &Url {
        &self.query_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    async fn query<T: DeserializeOwned>(
        &self,
        groq: &str,
        params: &[(&str, Value)],
    ) -> Result<T, ContentError> {
        let mut url = (*self.query_url).clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", groq);
            for (name, value) in params {
                pairs.append_pair(&format!("${name}"), &value.to_string());
            }
        }

        let mut request = self.client.get(url.as_str());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?.error_for_status()?;
        let body: QueryResponse<T> = response.json().await?;
        Ok(body.result)
    }

    pub async fn fetch_sessions(&self, query: &SessionQuery) -> Result<Vec<Session>, ContentError> {
        let (groq, params) = query.groq();
        let records: Option<Vec<Value>> = self.query(&groq, &params).await?;
        let sessions: Vec<Session> = decode_records("session", records);
        debug!(count = sessions.len(), "fetched sessions in bounding box");
        Ok(sessions)
    }

    pub async fn fetch_categories(&self) -> Result<Vec<Category>, ContentError> {
        let records: Option<Vec<Value>> = self.query(CATEGORIES_QUERY, &[]).await?;
        Ok(decode_records("category", records))
    }

    /// Distinct booked session ids for `user_id`, first-seen order.
    /// Dangling references come back as null and are skipped.
    pub async fn fetch_booked_session_ids(&self, user_id: &str) -> Result<Vec<String>, ContentError> {
        let ids: Option<Vec<Option<String>>> = self
            .query(USER_BOOKED_SESSION_IDS_QUERY, &[("clerkId", json!(user_id))])
            .await?;
        let mut seen = HashSet::new();
        Ok(ids
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter(|id| seen.insert(id.clone()))
            .collect())
    }

    pub async fn fetch_venue_name(&self, venue_id: &str) -> Result<Option<String>, ContentError> {
        let venue: Option<VenueName> = self
            .query(VENUE_NAME_BY_ID_QUERY, &[("venueId", json!(venue_id))])
            .await?;
        Ok(venue.and_then(|v| v.name))
    }

    pub async fn fetch_user_preferences(
        &self,
        user_id: &str,
    ) -> Result<Option<UserPreferences>, ContentError> {
        self.query(USER_PREFERENCES_QUERY, &[("clerkId", json!(user_id))])
            .await
    }
}
