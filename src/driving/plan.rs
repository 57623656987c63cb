//! Downsampled plan exports
//!
//! Converts a traced route into the two read-only projections external
//! consumers subscribe to: a GPS-coordinate plan and a world-coordinate
//! plan, both thinned to every Nth point plus maneuver transitions.

use super::types::{Position, RoadOption, RoutePoint};

/// Earth radius used by the flat-world GPS projection, in world units
const EARTH_RADIUS: f64 = 6_371_000.0;

/// A geodetic point produced from a world location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPoint {
    pub lat: f64,
    pub lon: f64,
    pub alt: f32,
}

/// Equirectangular projection of a world location onto lat/lon
pub fn location_to_gps(location: Position) -> GpsPoint {
    GpsPoint {
        lat: (f64::from(location.y) / EARTH_RADIUS).to_degrees(),
        lon: (f64::from(location.x) / EARTH_RADIUS).to_degrees(),
        alt: location.z,
    }
}

/// GPS projection of every point of a route trace
pub fn route_to_gps(route: &[RoutePoint]) -> Vec<(GpsPoint, RoadOption)> {
    route
        .iter()
        .map(|rp| (location_to_gps(rp.location()), rp.option))
        .collect()
}

/// Indices of the points a downsampled plan keeps
///
/// Keeps the first point, every index where the maneuver option changes,
/// every `step`-th point of a lane-follow stretch, and the final point.
pub fn downsample_route(route: &[RoutePoint], step: usize) -> Vec<usize> {
    let mut ids = Vec::new();
    let mut prev_option: Option<RoadOption> = None;
    let mut since_kept = 0usize;

    for (i, point) in route.iter().enumerate() {
        let is_transition = prev_option.is_some_and(|prev| prev != point.option);
        if i == 0 || is_transition || since_kept >= step || i == route.len() - 1 {
            ids.push(i);
            since_kept = 0;
        } else {
            since_kept += 1;
        }
        prev_option = Some(point.option);
    }

    ids
}
