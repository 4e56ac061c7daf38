use chrono::Duration;
use icalendar::{Calendar, Component, Event, EventLike};

use crate::distance::DistanceUnit;
use crate::models::SessionWithDistance;

const DEFAULT_DURATION_MIN: i64 = 60;

#[derive(Clone, Default)]
pub struct ICalExporter;

impl ICalExporter {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, sessions: &[SessionWithDistance], unit: DistanceUnit) -> Vec<u8> {
        if sessions.is_empty() {
            return Vec::new();
        }

        let mut calendar = Calendar::new();
        calendar.name("Classes near you");

        for session in sessions {
            let name = session
                .activity
                .as_ref()
                .map(|a| a.name.as_str())
                .unwrap_or("Class");
            let duration = session
                .activity
                .as_ref()
                .and_then(|a| a.duration)
                .map(i64::from)
                .unwrap_or(DEFAULT_DURATION_MIN);

            let mut description = format!(
                "{:.1} {} away",
                session.distance,
                unit.abbreviation()
            );
            if let Some(instructor) = session.activity.as_ref().and_then(|a| a.instructor.as_deref()) {
                description.push_str(&format!("\nInstructor: {instructor}"));
            }

            let mut event = Event::new();
            event.summary(name);
            event.starts(session.start_time);
            event.ends(session.start_time + Duration::minutes(duration));
            event.location(&session.venue.name);
            event.description(&description);
            event.uid(&format!("{}@class-finder", session.id));
            calendar.push(event);
        }

        calendar.to_string().into_bytes()
    }
}
