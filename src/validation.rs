use serde::Deserialize;

use crate::distance::Coordinate;
use crate::error::ApiError;
use crate::models::UserPreferences;

const MAX_SEARCH_LEN: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct ClassesQuery {
    pub q: Option<String>,
    pub venue: Option<String>,
    pub category: Option<String>,
    pub tier: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassFilters {
    pub search: Option<String>,
    pub venue_id: Option<String>,
    pub category_ids: Vec<String>,
    pub tier_levels: Vec<String>,
}

impl ClassFilters {
    pub fn active_count(&self) -> usize {
        usize::from(self.venue_id.is_some()) + self.category_ids.len() + self.tier_levels.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchArea {
    pub origin: Coordinate,
    pub radius: f64,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn validate_filters(query: &ClassesQuery) -> Result<ClassFilters, ApiError> {
    let search = non_empty(query.q.as_deref());
    if let Some(term) = &search
        && term.chars().count() > MAX_SEARCH_LEN
    {
        return Err(ApiError::BadRequest(format!(
            "q must be at most {MAX_SEARCH_LEN} characters"
        )));
    }

    Ok(ClassFilters {
        search,
        venue_id: non_empty(query.venue.as_deref()),
        category_ids: split_list(query.category.as_deref()),
        tier_levels: split_list(query.tier.as_deref()),
    })
}

/// `None` means the user still has to finish onboarding.
pub fn search_area(preferences: Option<&UserPreferences>) -> Option<SearchArea> {
    let preferences = preferences?;
    let location = preferences.location?;
    let radius = preferences.search_radius?;

    let origin = match Coordinate::new(location.lat, location.lng) {
        Ok(origin) => origin,
        Err(err) => {
            tracing::warn!(error = %err, "stored user location is invalid");
            return None;
        }
    };
    if !(radius.is_finite() && radius > 0.0) {
        tracing::warn!(radius, "stored search radius is invalid");
        return None;
    }
    Some(SearchArea { origin, radius })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs(location: Option<(f64, f64)>, radius: Option<f64>) -> UserPreferences {
        UserPreferences {
            location: location.map(|(lat, lng)| Coordinate { lat, lng }),
            search_radius: radius,
        }
    }

    #[test]
    fn test_validate_filters_splits_lists() {
        let query = ClassesQuery {
            q: Some("   ".to_string()),
            venue: Some("venue-1".to_string()),
            category: Some("yoga,,pilates, ".to_string()),
            tier: Some("basic".to_string()),
            token: None,
        };
        let filters = validate_filters(&query).unwrap();
        assert_eq!(filters.search, None);
        assert_eq!(filters.venue_id.as_deref(), Some("venue-1"));
        assert_eq!(filters.category_ids, vec!["yoga", "pilates"]);
        assert_eq!(filters.tier_levels, vec!["basic"]);
        assert_eq!(filters.active_count(), 4);
    }

    #[test]
    fn test_validate_filters_empty() {
        let filters = validate_filters(&ClassesQuery::default()).unwrap();
        assert_eq!(filters, ClassFilters::default());
        assert_eq!(filters.active_count(), 0);
    }

    #[test]
    fn test_validate_filters_search_length() {
        let ok = ClassesQuery {
            q: Some(" spin ".to_string()),
            ..Default::default()
        };
        assert_eq!(validate_filters(&ok).unwrap().search.as_deref(), Some("spin"));

        let too_long = ClassesQuery {
            q: Some("x".repeat(MAX_SEARCH_LEN + 1)),
            ..Default::default()
        };
        assert!(matches!(
            validate_filters(&too_long),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_search_area() {
        let area = search_area(Some(&prefs(Some((51.5, -0.12)), Some(10.0)))).unwrap();
        assert_eq!(area.radius, 10.0);
        assert_eq!(area.origin.lat, 51.5);

        assert!(search_area(None).is_none());
        assert!(search_area(Some(&prefs(None, Some(10.0)))).is_none());
        assert!(search_area(Some(&prefs(Some((51.5, -0.12)), None))).is_none());
        assert!(search_area(Some(&prefs(Some((51.5, -0.12)), Some(0.0)))).is_none());
        assert!(search_area(Some(&prefs(Some((95.0, -0.12)), Some(5.0)))).is_none());
    }
}
