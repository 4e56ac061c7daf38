//! Geographic primitives for radius search.
//!
//! | Item | Description |
//! |------|-------------|
//! | [`Coordinate`] | Latitude/longitude pair in decimal degrees |
//! | [`haversine_distance`] | Great-circle distance in a [`DistanceUnit`] |
//! | [`bounding_box`] | Rectangular superset of a search disk, used as a query prefilter |
//!
//! The bounding box is only a hint for the content store. The precise filter
//! in [`crate::pipeline`] enforces the true circular radius.

use geo::{Distance, Haversine, Point};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Mean Earth radius used by the `geo` haversine metric.
pub const EARTH_MEAN_RADIUS_METERS: f64 = 6_371_008.8;

/// Floor for `cos(lat)` so the longitude delta never divides by zero near a pole.
const POLAR_COS_EPSILON: f64 = 1e-6;

#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    #[error("latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinate {
    #[schema(example = 51.5074)]
    pub lat: f64,
    #[schema(example = -0.1278)]
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        let coordinate = Self { lat, lng };
        if !(lat.is_finite() && (-90.0..=90.0).contains(&lat)) {
            return Err(GeoError::InvalidLatitude(lat));
        }
        if !(lng.is_finite() && (-180.0..=180.0).contains(&lng)) {
            return Err(GeoError::InvalidLongitude(lng));
        }
        Ok(coordinate)
    }

    pub fn is_valid(&self) -> bool {
        Self::new(self.lat, self.lng).is_ok()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
}

impl DistanceUnit {
    pub fn meters_per_unit(self) -> f64 {
        match self {
            DistanceUnit::Miles => 1_609.344,
            DistanceUnit::Kilometers => 1_000.0,
        }
    }

    pub fn earth_radius(self) -> f64 {
        EARTH_MEAN_RADIUS_METERS / self.meters_per_unit()
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            DistanceUnit::Miles => "mi",
            DistanceUnit::Kilometers => "km",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    const FULL_LNG: (f64, f64) = (-180.0, 180.0);

    #[cfg(test)]
    fn contains(&self, point: Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }

    pub fn spans_all_longitudes(&self) -> bool {
        (self.min_lng, self.max_lng) == Self::FULL_LNG
    }
}

/// Great-circle distance between two coordinates, in `unit`.
#[inline]
pub fn haversine_distance(a: Coordinate, b: Coordinate, unit: DistanceUnit) -> f64 {
    let from = Point::new(a.lng, a.lat);
    let to = Point::new(b.lng, b.lat);
    Haversine::distance(from, to) / unit.meters_per_unit()
}

/// Compute a box guaranteed to contain every point within `radius` of `center`.
///
/// The latitude delta is the angular radius itself. The longitude delta is the
/// widest longitude the disk reaches at `center.lat`, `asin(sin(r) / cos(lat))`.
/// When the disk covers a pole or crosses the antimeridian the longitude range
/// widens to the whole circle instead of wrapping, so the box stays a superset.
pub fn bounding_box(center: Coordinate, radius: f64, unit: DistanceUnit) -> BoundingBox {
    let angular = radius.max(0.0) / unit.earth_radius();
    let lat_delta = angular.to_degrees();

    let min_lat = center.lat - lat_delta;
    let max_lat = center.lat + lat_delta;

    if min_lat <= -90.0 || max_lat >= 90.0 {
        return BoundingBox {
            min_lat: min_lat.max(-90.0),
            max_lat: max_lat.min(90.0),
            min_lng: BoundingBox::FULL_LNG.0,
            max_lng: BoundingBox::FULL_LNG.1,
        };
    }

    let cos_lat = center.lat.to_radians().cos().max(POLAR_COS_EPSILON);
    let ratio = angular.sin() / cos_lat;
    let (min_lng, max_lng) = if ratio >= 1.0 {
        BoundingBox::FULL_LNG
    } else {
        let lng_delta = ratio.asin().to_degrees();
        let (west, east) = (center.lng - lng_delta, center.lng + lng_delta);
        if west < -180.0 || east > 180.0 {
            BoundingBox::FULL_LNG
        } else {
            (west, east)
        }
    };

    BoundingBox {
        min_lat,
        max_lat,
        min_lng,
        max_lng,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    /// Point reached by travelling `distance` from `start` on `bearing_deg`.
    fn destination(start: Coordinate, bearing_deg: f64, distance: f64, unit: DistanceUnit) -> Coordinate {
        let delta = distance / unit.earth_radius();
        let theta = bearing_deg.to_radians();
        let phi1 = start.lat.to_radians();
        let lambda1 = start.lng.to_radians();
        let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
        let lambda2 = lambda1
            + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());
        let lng = (lambda2.to_degrees() + 540.0) % 360.0 - 180.0;
        Coordinate {
            lat: phi2.to_degrees(),
            lng,
        }
    }

    #[test]
    fn test_coordinate_new_rejects_out_of_range() {
        assert!(Coordinate::new(51.5, -0.12).is_ok());
        assert_eq!(Coordinate::new(91.0, 0.0), Err(GeoError::InvalidLatitude(91.0)));
        assert_eq!(
            Coordinate::new(0.0, -180.5),
            Err(GeoError::InvalidLongitude(-180.5))
        );
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(!Coordinate { lat: 0.0, lng: 200.0 }.is_valid());
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let p = Coordinate { lat: 51.5074, lng: -0.1278 };
        assert_eq!(haversine_distance(p, p, DistanceUnit::Miles), 0.0);
    }

    #[test]
    fn test_haversine_distance_known_value() {
        // London to Paris is roughly 344 km / 213 mi
        let london = Coordinate { lat: 51.5074, lng: -0.1278 };
        let paris = Coordinate { lat: 48.8566, lng: 2.3522 };
        let km = haversine_distance(london, paris, DistanceUnit::Kilometers);
        let mi = haversine_distance(london, paris, DistanceUnit::Miles);
        assert!(approx_eq(km, 343.5, 5.0));
        assert!(approx_eq(mi, 213.5, 3.0));
    }

    #[test]
    fn test_bounding_box_contains_center_and_is_symmetric() {
        let center = Coordinate { lat: 40.7128, lng: -74.006 };
        let bbox = bounding_box(center, 10.0, DistanceUnit::Miles);
        assert!(bbox.contains(center));
        assert!(approx_eq(center.lat - bbox.min_lat, bbox.max_lat - center.lat, 1e-9));
        assert!(approx_eq(center.lng - bbox.min_lng, bbox.max_lng - center.lng, 1e-9));
        // Longitude degrees are shorter away from the equator
        assert!(bbox.max_lng - bbox.min_lng > bbox.max_lat - bbox.min_lat);
    }

    #[test]
    fn test_bounding_box_zero_radius() {
        let center = Coordinate { lat: 10.0, lng: 20.0 };
        let bbox = bounding_box(center, 0.0, DistanceUnit::Miles);
        assert_eq!(bbox.min_lat, 10.0);
        assert_eq!(bbox.max_lat, 10.0);
        assert_eq!(bbox.min_lng, 20.0);
        assert_eq!(bbox.max_lng, 20.0);

        let negative = bounding_box(center, -5.0, DistanceUnit::Miles);
        assert_eq!(negative, bbox);
    }

    #[test]
    fn test_bounding_box_contains_radius_circle() {
        let centers = [
            Coordinate { lat: 0.0, lng: 0.0 },
            Coordinate { lat: 51.5074, lng: -0.1278 },
            Coordinate { lat: -33.8688, lng: 151.2093 },
            Coordinate { lat: 64.1466, lng: -21.9426 },
            Coordinate { lat: 78.2232, lng: 15.6267 },
            Coordinate { lat: -54.8019, lng: -68.303 },
        ];
        for unit in [DistanceUnit::Miles, DistanceUnit::Kilometers] {
            for center in centers {
                for radius in [1.0, 25.0, 250.0] {
                    let bbox = bounding_box(center, radius, unit);
                    for step in 0..72 {
                        let point = destination(center, step as f64 * 5.0, radius * 0.999, unit);
                        assert!(
                            haversine_distance(center, point, unit) <= radius,
                            "destination helper overshot"
                        );
                        assert!(
                            bbox.contains(point),
                            "{point:?} within {radius} of {center:?} not in {bbox:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_bounding_box_near_pole_stays_finite() {
        let center = Coordinate { lat: 89.0, lng: 30.0 };
        let bbox = bounding_box(center, 50.0, DistanceUnit::Miles);
        for value in [bbox.min_lat, bbox.max_lat, bbox.min_lng, bbox.max_lng] {
            assert!(value.is_finite());
        }
        assert!(bbox.max_lat <= 90.0);
        assert!(bbox.min_lng >= -180.0 && bbox.max_lng <= 180.0);
        assert!(bbox.max_lng - bbox.min_lng <= 360.0);
    }

    #[test]
    fn test_bounding_box_covering_pole_spans_all_longitudes() {
        let center = Coordinate { lat: 89.9, lng: 0.0 };
        let bbox = bounding_box(center, 50.0, DistanceUnit::Miles);
        assert_eq!(bbox.max_lat, 90.0);
        assert!(bbox.spans_all_longitudes());

        let exact_pole = bounding_box(Coordinate { lat: -90.0, lng: 0.0 }, 1.0, DistanceUnit::Kilometers);
        assert_eq!(exact_pole.min_lat, -90.0);
        assert!(exact_pole.spans_all_longitudes());
    }

    #[test]
    fn test_bounding_box_across_antimeridian_spans_all_longitudes() {
        let fiji = Coordinate { lat: -17.7134, lng: 179.9 };
        let bbox = bounding_box(fiji, 30.0, DistanceUnit::Miles);
        assert!(bbox.spans_all_longitudes());
        assert!(bbox.contains(Coordinate { lat: -17.7, lng: -179.9 }));
    }
}
