//! Driving-task core
//!
//! All of the session logic lives here, independent of any particular
//! driver loop; the binary and the tests both run it headlessly.

mod atlas;
mod control;
mod geometry;
mod hazard;
pub mod monitors;
mod plan;
mod route;
mod session;
mod types;
mod world;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use atlas::{JunctionId, Road, RoadAtlas};
#[allow(unused_imports)]
pub use control::{reactive_step, LocalPlanner, TARGET_SPEED};
#[allow(unused_imports)]
pub use geometry::{
    is_within_distance_ahead, point_to_segment_distance, signed_yaw_delta, walker_cone_half_angle,
    yaw_difference,
};
#[allow(unused_imports)]
pub use hazard::{vehicle_hazard_ahead, walker_hazard_ahead};
#[allow(unused_imports)]
pub use plan::{downsample_route, location_to_gps, route_to_gps, GpsPoint};
#[allow(unused_imports)]
pub use route::{
    RouteTracker, COMPLETION_DISTANCE, COMPLETION_PERCENTAGE, TRUNCATE_MAX_DISTANCE,
    TRUNCATE_MIN_DISTANCE,
};
pub use session::Session;
#[allow(unused_imports)]
pub use types::{
    ActorId, LaneId, Position, RoadId, RoadOption, RoutePoint, Timestamp, TrafficLightState,
    Transform, VehicleControl, VehicleLights, Waypoint, LANE_HALF_WIDTH, PROXIMITY_THRESHOLD,
    ROUTE_RESOLUTION, SIDEWALK_WIDTH,
};
#[allow(unused_imports)]
pub use world::{ActorKind, ActorState, StopSign, TrafficLight, WorldState};
