//! Core types for the driving-task session
//!
//! Standalone value types shared by the route tracker, monitors and the
//! world/atlas services.

/// A unique identifier for simulation actors (vehicles, walkers, signals)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub usize);

/// A wrapper type for road IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoadId(pub usize);

/// A wrapper type for lane IDs (signed, negative for the opposite direction)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaneId(pub i32);

/// A 3D position in the simulation (ground plane x-y, z up)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance projected onto the ground plane
    pub fn distance_2d(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Heading in degrees from this position to another, measured from +x
    pub fn yaw_to(&self, other: &Position) -> f32 {
        (other.y - self.y).atan2(other.x - self.x).to_degrees()
    }
}

/// A pose: location plus heading about the vertical axis
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub location: Position,
    pub yaw: f32,
}

impl Transform {
    pub fn new(location: Position, yaw: f32) -> Self {
        Self { location, yaw }
    }

    /// Unit vector in the heading direction, on the ground plane
    pub fn forward_vector(&self) -> (f32, f32) {
        let rad = self.yaw.to_radians();
        (rad.cos(), rad.sin())
    }
}

/// A point on the road network: pose plus road/lane identity
///
/// Immutable once returned by the atlas; the session never edits one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub transform: Transform,
    pub road_id: RoadId,
    pub lane_id: LaneId,
}

/// Maneuver option attached to a planned route point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadOption {
    /// Keep following the current lane
    LaneFollow,
    /// Turn left at the upcoming junction
    Left,
    /// Turn right at the upcoming junction
    Right,
    /// Drive straight through the upcoming junction
    Straight,
}

/// One step of a planned route
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutePoint {
    pub waypoint: Waypoint,
    pub option: RoadOption,
}

impl RoutePoint {
    pub fn location(&self) -> Position {
        self.waypoint.transform.location
    }
}

/// Driving command produced by the reactive controller or the local planner
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleControl {
    /// Accelerator in [0, 1]
    pub throttle: f32,
    /// Steering in [-1, 1], negative is left
    pub steer: f32,
    /// Brake in [0, 1]
    pub brake: f32,
}

impl VehicleControl {
    pub fn new(throttle: f32, steer: f32, brake: f32) -> Self {
        Self {
            throttle,
            steer,
            brake,
        }
    }

    /// Full stop command
    pub fn emergency_stop() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

/// Traffic light phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficLightState {
    Red,
    Yellow,
    Green,
}

/// Vehicle light configuration set by the compliance suite each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VehicleLights {
    #[default]
    Off,
    /// Position lights plus low beam, used when the sun is below the horizon
    PositionLowBeam,
}

/// Frame-locked simulation timestamp handed in by the external driver
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Timestamp {
    pub step: u64,
    /// Seconds of simulated time since the session started
    pub simulation_time: f32,
}

/// Radius of the forward hazard cone in world units
pub const PROXIMITY_THRESHOLD: f32 = 12.0;

/// Half lane width; points this close to a road centerline are on the road
pub const LANE_HALF_WIDTH: f32 = 2.0;

/// Width of the sidewalk band flanking every road
pub const SIDEWALK_WIDTH: f32 = 2.0;

/// Spacing of traced route waypoints
pub const ROUTE_RESOLUTION: f32 = 1.0;
