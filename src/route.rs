//! # Route Engine
//!
//! Maps cumulative miles walked onto a fixed, ordered sequence of waypoints.
//!
//! The route is loaded once and never mutated. Distances beyond the route's
//! total wrap around: every full traversal is a completed *crossing* and the
//! position restarts at the origin.
//!
//! ```rust
//! use walks_tracker::RouteEngine;
//!
//! let engine = RouteEngine::i90();
//! let position = engine.locate(300.0).unwrap();
//! assert_eq!(position.current_waypoint.city, "Spokane");
//! assert_eq!(position.next_waypoint.unwrap().city, "Missoula");
//! ```

use geo::{
    BoundingRect, Coord, Distance, Haversine, Line, LineInterpolatePoint, LineString, Point,
};
use log::{debug, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{OptionExt, Result, TrackerError};
use crate::{GpsPoint, RouteBounds};

const METERS_PER_MILE: f64 = 1609.344;

/// Seattle to Boston along I-90: (city, state, miles from start, lat, lon).
const I90_WAYPOINTS: &[(&str, &str, f64, f64, f64)] = &[
    ("Seattle", "WA", 0.0, 47.6080, -122.3375),
    ("Spokane", "WA", 280.0, 47.6588, -117.4260),
    ("Missoula", "MT", 473.0, 46.8721, -113.9940),
    ("Billings", "MT", 740.0, 45.7833, -108.5007),
    ("Rapid City", "SD", 1040.0, 44.0805, -103.2310),
    ("Sioux Falls", "SD", 1390.0, 43.5460, -96.7313),
    ("Madison", "WI", 1700.0, 43.0731, -89.4012),
    ("Chicago", "IL", 1850.0, 41.8781, -87.6298),
    ("Cleveland", "OH", 2190.0, 41.4993, -81.6944),
    ("Buffalo", "NY", 2380.0, 42.8864, -78.8784),
    ("Albany", "NY", 2660.0, 42.6526, -73.7562),
    ("Boston", "MA", 2850.0, 42.3601, -71.0589),
];

/// Shared engine over the built-in I-90 route.
pub static DEFAULT_ROUTE: Lazy<RouteEngine> = Lazy::new(RouteEngine::i90);

// ============================================================================
// Types
// ============================================================================

/// A named point along the route with a fixed distance from the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Position in the route sequence (0 = origin)
    pub index: u32,
    pub city: String,
    pub state: String,
    pub lat: f64,
    pub lon: f64,
    /// Road miles from the origin
    pub miles_from_start: f64,
}

impl Waypoint {
    pub fn new(
        index: u32,
        city: &str,
        state: &str,
        lat: f64,
        lon: f64,
        miles_from_start: f64,
    ) -> Self {
        Self {
            index,
            city: city.to_string(),
            state: state.to_string(),
            lat,
            lon,
            miles_from_start,
        }
    }

    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.lat, self.lon)
    }

    /// "City, ST" label used by the dashboard.
    pub fn label(&self) -> String {
        format!("{}, {}", self.city, self.state)
    }

    /// Great-circle distance to another waypoint in miles.
    pub fn great_circle_miles_to(&self, other: &Waypoint) -> f64 {
        let from = Point::new(self.lon, self.lat);
        let to = Point::new(other.lon, other.lat);
        Haversine::distance(from, to) / METERS_PER_MILE
    }

    fn coord(&self) -> Coord {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }
}

/// An ordered, validated waypoint sequence.
///
/// Invariant: `total_distance == waypoints.last().miles_from_start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub total_distance: f64,
    pub waypoints: Vec<Waypoint>,
}

impl Route {
    /// Validate and build a route.
    ///
    /// Requires at least two waypoints, an origin at mile 0, strictly
    /// increasing mileage, valid coordinates, and indices matching sequence
    /// position.
    pub fn new(waypoints: Vec<Waypoint>) -> Result<Self> {
        if waypoints.len() < 2 {
            return Err(TrackerError::invalid(format!(
                "route needs at least 2 waypoints, got {}",
                waypoints.len()
            )));
        }

        let origin = waypoints.first().ok_or_invalid("route has no waypoints")?;
        if origin.miles_from_start != 0.0 {
            return Err(TrackerError::invalid(format!(
                "origin '{}' must be at mile 0, got {}",
                origin.city, origin.miles_from_start
            )));
        }

        for (i, wp) in waypoints.iter().enumerate() {
            if wp.index as usize != i {
                return Err(TrackerError::invalid(format!(
                    "waypoint '{}' has index {} at position {}",
                    wp.city, wp.index, i
                )));
            }
            if !wp.point().is_valid() || !wp.miles_from_start.is_finite() {
                return Err(TrackerError::invalid(format!(
                    "waypoint '{}' has invalid coordinates or mileage",
                    wp.city
                )));
            }
        }

        for pair in waypoints.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.miles_from_start <= prev.miles_from_start {
                return Err(TrackerError::invalid(format!(
                    "mileage must strictly increase: '{}' at {} follows '{}' at {}",
                    next.city, next.miles_from_start, prev.city, prev.miles_from_start
                )));
            }

            // Road distance can't beat the straight line; flag likely typos
            let road = next.miles_from_start - prev.miles_from_start;
            let straight = prev.great_circle_miles_to(next);
            if road < straight * 0.95 {
                warn!(
                    "[Route] Segment {} -> {} is {:.0} road miles but {:.0} miles apart",
                    prev.city, next.city, road, straight
                );
            }
        }

        let total_distance = waypoints
            .last()
            .map(|wp| wp.miles_from_start)
            .ok_or_invalid("route has no waypoints")?;

        Ok(Self {
            total_distance,
            waypoints,
        })
    }
}

/// Where a given cumulative distance lands on the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Cumulative miles, including completed crossings
    pub miles_traveled: f64,
    /// Miles into the current crossing
    pub effective_miles: f64,
    pub crossings_completed: u32,
    /// Interpolated coordinates between current and next waypoint
    pub location: GpsPoint,
    pub current_waypoint: Waypoint,
    /// `None` when standing on the destination
    pub next_waypoint: Option<Waypoint>,
    pub miles_to_next: f64,
    /// 0-100
    pub percent_complete: f64,
}

// ============================================================================
// Route Engine
// ============================================================================

/// Read-only engine over a validated [`Route`].
#[derive(Debug, Clone, PartialEq)]
pub struct RouteEngine {
    route: Route,
}

impl RouteEngine {
    /// Build an engine from waypoints, validating them.
    pub fn new(waypoints: Vec<Waypoint>) -> Result<Self> {
        let route = Route::new(waypoints)?;
        debug!(
            "[Route] Loaded {} waypoints, {} miles",
            route.waypoints.len(),
            route.total_distance
        );
        Ok(Self { route })
    }

    /// The built-in Seattle to Boston route (2850 miles).
    pub fn i90() -> Self {
        let waypoints = I90_WAYPOINTS
            .iter()
            .enumerate()
            .map(|(i, &(city, state, miles, lat, lon))| {
                Waypoint::new(i as u32, city, state, lat, lon, miles)
            })
            .collect::<Vec<_>>();
        let total_distance = I90_WAYPOINTS[I90_WAYPOINTS.len() - 1].2;
        Self {
            route: Route {
                total_distance,
                waypoints,
            },
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// The configured waypoints, origin first.
    pub fn list_waypoints(&self) -> &[Waypoint] {
        &self.route.waypoints
    }

    pub fn total_distance(&self) -> f64 {
        self.route.total_distance
    }

    /// Number of full crossings contained in `miles_traveled`.
    pub fn crossings(&self, miles_traveled: f64) -> u32 {
        (miles_traveled.max(0.0) / self.route.total_distance).floor() as u32
    }

    /// Locate a cumulative distance on the route.
    ///
    /// Distances past the destination wrap around. A distance that is an
    /// exact, non-zero multiple of the route length is reported as standing
    /// on the destination with no next waypoint. The lap counter has already
    /// rolled over, so `effective_miles` and `percent_complete` are 0 and the
    /// full route length remains for the next lap.
    ///
    /// Fails with [`TrackerError::InvalidArgument`] for negative or
    /// non-finite input.
    pub fn locate(&self, miles_traveled: f64) -> Result<Position> {
        if !miles_traveled.is_finite() || miles_traveled < 0.0 {
            return Err(TrackerError::invalid(format!(
                "miles traveled must be a finite value >= 0, got {}",
                miles_traveled
            )));
        }

        Ok(self.position_at(miles_traveled))
    }

    /// Position for an already validated (finite, non-negative) distance.
    pub(crate) fn position_at(&self, miles_traveled: f64) -> Position {
        let total = self.route.total_distance;
        let waypoints = &self.route.waypoints;

        let mut effective_miles = miles_traveled % total;
        if effective_miles >= total {
            effective_miles = 0.0;
        }
        let crossings_completed = ((miles_traveled - effective_miles) / total).round() as u32;

        if crossings_completed > 0 && effective_miles == 0.0 {
            let destination = &waypoints[waypoints.len() - 1];
            return Position {
                miles_traveled,
                effective_miles,
                crossings_completed,
                location: destination.point(),
                current_waypoint: destination.clone(),
                next_waypoint: None,
                miles_to_next: 0.0,
                percent_complete: 0.0,
            };
        }

        // Last waypoint at or before the effective distance; the origin is
        // at mile 0 so at least one always qualifies
        let current_idx = waypoints
            .partition_point(|wp| wp.miles_from_start <= effective_miles)
            .saturating_sub(1);
        let current = &waypoints[current_idx];
        let next = waypoints.get(current_idx + 1);

        let (location, miles_to_next) = match next {
            Some(next) => {
                let segment_length = next.miles_from_start - current.miles_from_start;
                let ratio = if segment_length > 0.0 {
                    (effective_miles - current.miles_from_start) / segment_length
                } else {
                    0.0
                };
                let location = Line::new(current.coord(), next.coord())
                    .line_interpolate_point(ratio)
                    .map(|p| GpsPoint::new(p.y(), p.x()))
                    .unwrap_or_else(|| current.point());
                (location, next.miles_from_start - effective_miles)
            }
            None => (current.point(), 0.0),
        };

        let percent_complete = (100.0 * effective_miles / total).clamp(0.0, 100.0);

        Position {
            miles_traveled,
            effective_miles,
            crossings_completed,
            location,
            current_waypoint: current.clone(),
            next_waypoint: next.cloned(),
            miles_to_next,
            percent_complete,
        }
    }

    /// Bounding box of all waypoints.
    pub fn bounds(&self) -> Option<RouteBounds> {
        let line: LineString = self.route.waypoints.iter().map(|wp| wp.coord()).collect();
        line.bounding_rect().map(|rect| RouteBounds {
            min_lat: rect.min().y,
            max_lat: rect.max().y,
            min_lng: rect.min().x,
            max_lng: rect.max().x,
        })
    }

    /// Route as JSON: `{ total_distance, waypoints: [...] }`.
    pub fn route_json(&self) -> String {
        serde_json::to_string(&self.route).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for RouteEngine {
    fn default() -> Self {
        Self::i90()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn three_stop_route() -> RouteEngine {
        RouteEngine::new(vec![
            Waypoint::new(0, "Seattle", "WA", 47.6080, -122.3375, 0.0),
            Waypoint::new(1, "Sioux Falls", "SD", 43.5460, -96.7313, 1426.0),
            Waypoint::new(2, "Boston", "MA", 42.3601, -71.0589, 2850.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_builtin_route_is_valid() {
        let engine = RouteEngine::i90();
        assert_eq!(engine.list_waypoints().len(), 12);
        assert_eq!(engine.total_distance(), 2850.0);
        assert!(Route::new(engine.list_waypoints().to_vec()).is_ok());
        assert_eq!(DEFAULT_ROUTE.total_distance(), 2850.0);
    }

    #[test]
    fn test_rejects_non_monotonic_mileage() {
        let result = RouteEngine::new(vec![
            Waypoint::new(0, "A", "WA", 47.0, -122.0, 0.0),
            Waypoint::new(1, "B", "WA", 47.0, -117.0, 300.0),
            Waypoint::new(2, "C", "MT", 46.0, -114.0, 300.0),
        ]);
        assert!(matches!(result, Err(TrackerError::InvalidArgument { .. })));
    }

    #[test]
    fn test_rejects_origin_not_at_zero() {
        let result = RouteEngine::new(vec![
            Waypoint::new(0, "A", "WA", 47.0, -122.0, 5.0),
            Waypoint::new(1, "B", "WA", 47.0, -117.0, 300.0),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_single_waypoint_and_bad_index() {
        assert!(RouteEngine::new(vec![Waypoint::new(0, "A", "WA", 47.0, -122.0, 0.0)]).is_err());

        let result = RouteEngine::new(vec![
            Waypoint::new(0, "A", "WA", 47.0, -122.0, 0.0),
            Waypoint::new(5, "B", "WA", 47.0, -117.0, 300.0),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_locate_origin() {
        let engine = RouteEngine::i90();
        let pos = engine.locate(0.0).unwrap();
        assert_eq!(pos.current_waypoint.city, "Seattle");
        assert_eq!(pos.next_waypoint.unwrap().city, "Spokane");
        assert_eq!(pos.miles_to_next, 280.0);
        assert_eq!(pos.percent_complete, 0.0);
        assert_eq!(pos.crossings_completed, 0);
        assert_eq!(pos.location, GpsPoint::new(47.6080, -122.3375));
    }

    #[test]
    fn test_locate_on_waypoint_is_inclusive() {
        let engine = three_stop_route();
        let pos = engine.locate(1426.0).unwrap();
        assert_eq!(pos.current_waypoint.city, "Sioux Falls");
        assert_eq!(pos.next_waypoint.as_ref().unwrap().city, "Boston");
        assert_eq!(pos.miles_to_next, 1424.0);
        assert!((pos.percent_complete - 50.035).abs() < 0.01);
    }

    #[test]
    fn test_locate_interpolates_location() {
        let engine = RouteEngine::new(vec![
            Waypoint::new(0, "A", "XX", 40.0, -100.0, 0.0),
            Waypoint::new(1, "B", "XX", 42.0, -90.0, 1000.0),
        ])
        .unwrap();
        let pos = engine.locate(250.0).unwrap();
        assert!((pos.location.latitude - 40.5).abs() < 1e-9);
        assert!((pos.location.longitude + 97.5).abs() < 1e-9);
        assert_eq!(pos.miles_to_next, 750.0);
    }

    #[test]
    fn test_locate_just_before_destination() {
        let engine = three_stop_route();
        let pos = engine.locate(2850.0 - 1e-6).unwrap();
        assert_eq!(pos.current_waypoint.city, "Sioux Falls");
        assert_eq!(pos.crossings_completed, 0);
        assert!(pos.percent_complete < 100.0);
    }

    #[test]
    fn test_locate_exact_destination() {
        let engine = three_stop_route();
        let pos = engine.locate(2850.0).unwrap();
        assert_eq!(pos.current_waypoint.city, "Boston");
        assert!(pos.next_waypoint.is_none());
        assert_eq!(pos.miles_to_next, 0.0);
        assert_eq!(pos.effective_miles, 0.0);
        assert_eq!(pos.crossings_completed, 1);
        assert_eq!(pos.percent_complete, 0.0);
    }

    #[test]
    fn test_locate_wraps_after_crossing() {
        let engine = RouteEngine::i90();
        let pos = engine.locate(2850.0 * 2.0 + 300.0).unwrap();
        assert_eq!(pos.crossings_completed, 2);
        assert!((pos.effective_miles - 300.0).abs() < 1e-9);
        assert_eq!(pos.current_waypoint.city, "Spokane");
        assert_eq!(engine.crossings(2850.0 * 2.0 + 300.0), 2);
    }

    #[test]
    fn test_locate_rejects_negative_and_nan() {
        let engine = RouteEngine::i90();
        assert!(matches!(
            engine.locate(-0.5),
            Err(TrackerError::InvalidArgument { .. })
        ));
        assert!(engine.locate(f64::NAN).is_err());
        assert!(engine.locate(f64::INFINITY).is_err());
    }

    #[test]
    fn test_locate_is_pure() {
        let engine = RouteEngine::i90();
        assert_eq!(engine.locate(1234.5).unwrap(), engine.locate(1234.5).unwrap());
    }

    #[test]
    fn test_percent_always_in_range() {
        let engine = RouteEngine::i90();
        for i in 0..200 {
            let miles = i as f64 * 73.3;
            let pct = engine.locate(miles).unwrap().percent_complete;
            assert!((0.0..=100.0).contains(&pct), "{} -> {}", miles, pct);
        }
    }

    #[test]
    fn test_bounds_and_json() {
        let engine = RouteEngine::i90();
        let bounds = engine.bounds().unwrap();
        assert_eq!(bounds.min_lng, -122.3375);
        assert_eq!(bounds.max_lng, -71.0589);
        assert_eq!(bounds.max_lat, 47.6588);

        let json: serde_json::Value = serde_json::from_str(&engine.route_json()).unwrap();
        assert_eq!(json["total_distance"], 2850.0);
        assert_eq!(json["waypoints"].as_array().unwrap().len(), 12);
        assert_eq!(json["waypoints"][11]["city"], "Boston");
    }

    #[test]
    fn test_great_circle_shorter_than_road() {
        let engine = RouteEngine::i90();
        let wps = engine.list_waypoints();
        let straight = wps[0].great_circle_miles_to(&wps[1]);
        assert!(straight > 200.0 && straight < 280.0);
        assert_eq!(wps[0].label(), "Seattle, WA");
    }
}
