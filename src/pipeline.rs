//! Radius filtering and grouping of class sessions for the listing page.
//!
//! Runs after the content store has applied the coarse bounding-box
//! prefilter. Every step here is a pure transformation of the request's
//! session snapshot.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::debug;

use crate::distance::{Coordinate, DistanceUnit, haversine_distance};
use crate::models::{DayGroup, ScheduledSession, Session, SessionWithDistance, Venue};

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub days: Vec<DayGroup>,
    pub venues: Vec<Venue>,
    pub total_sessions: usize,
}

/// Drop sessions without a start time, keeping input order.
pub fn schedule_sessions(sessions: Vec<Session>) -> Vec<ScheduledSession> {
    let total = sessions.len();
    let scheduled: Vec<ScheduledSession> =
        sessions.into_iter().filter_map(Session::scheduled).collect();
    if scheduled.len() != total {
        debug!(
            dropped = total - scheduled.len(),
            "sessions without a start time excluded"
        );
    }
    scheduled
}

/// Keep sessions whose venue lies within `radius` of `origin`, nearest first.
///
/// Sessions without a venue, or whose venue coordinate is out of range, are
/// dropped. The sort is stable so equal distances keep their input order.
pub fn filter_sessions_by_distance(
    sessions: &[ScheduledSession],
    origin: Coordinate,
    radius: f64,
    unit: DistanceUnit,
) -> Vec<SessionWithDistance> {
    let mut within: Vec<SessionWithDistance> = sessions
        .iter()
        .filter_map(|session| {
            let venue = match &session.venue {
                Some(venue) if venue.location.is_valid() => venue,
                Some(venue) => {
                    debug!(session = %session.id, venue = %venue.id, "venue coordinate out of range");
                    return None;
                }
                None => return None,
            };
            let distance = haversine_distance(origin, venue.location, unit);
            (distance <= radius).then(|| SessionWithDistance {
                id: session.id.clone(),
                start_time: session.start_time,
                status: session.status.clone(),
                max_capacity: session.max_capacity,
                activity: session.activity.clone(),
                venue: venue.clone(),
                distance,
            })
        })
        .collect();

    within.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    within
}

/// Bucket sessions by the calendar day of their start time in `tz`.
///
/// Groups appear in the order their day is first seen in `sessions`.
pub fn group_sessions_by_day(sessions: &[SessionWithDistance], tz: Tz) -> Vec<DayGroup> {
    let mut groups: Vec<DayGroup> = Vec::new();
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();

    for session in sessions {
        let date = session.start_time.with_timezone(&tz).date_naive();
        let slot = *index.entry(date).or_insert_with(|| {
            groups.push(DayGroup {
                date,
                sessions: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].sessions.push(session.clone());
    }

    groups
}

/// Distinct venues in first-seen order.
pub fn venues_for_map(sessions: &[SessionWithDistance]) -> Vec<Venue> {
    let mut seen = HashSet::new();
    sessions
        .iter()
        .filter(|session| seen.insert(session.venue.id.as_str()))
        .map(|session| session.venue.clone())
        .collect()
}

pub fn build_listing(
    sessions: Vec<Session>,
    origin: Coordinate,
    radius: f64,
    unit: DistanceUnit,
    tz: Tz,
) -> Listing {
    let scheduled = schedule_sessions(sessions);
    let nearby = filter_sessions_by_distance(&scheduled, origin, radius, unit);
    debug!(
        candidates = scheduled.len(),
        within_radius = nearby.len(),
        "radius filter applied"
    );

    Listing {
        days: group_sessions_by_day(&nearby, tz),
        venues: venues_for_map(&nearby),
        total_sessions: nearby.len(),
    }
}
