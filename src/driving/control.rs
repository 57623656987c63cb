//! Reactive control: emergency-stop gate over a lookahead path follower
//!
//! The local planner is the path-following service the session delegates
//! to whenever no hazard is present.

use anyhow::{ensure, Result};

use super::geometry::signed_yaw_delta;
use super::types::{RoutePoint, Transform, VehicleControl};

/// Cruise speed the planner regulates toward, units per second
pub const TARGET_SPEED: f32 = 9.5;

/// Route points closer than this are considered passed when steering
const LOOKAHEAD_DISTANCE: f32 = 3.0;

/// Yaw error that saturates the steering command, degrees
const STEER_SATURATION_YAW: f32 = 70.0;

/// Proportional gain on the speed error
const THROTTLE_GAIN: f32 = 0.35;

/// Throttle ceiling, matching a cautious urban profile
const MAX_THROTTLE: f32 = 0.75;

/// Overspeed fraction above which the planner brakes instead of coasting
const OVERSPEED_TOLERANCE: f32 = 1.1;

/// Lookahead pursuit steering plus proportional speed control
#[derive(Debug, Clone)]
pub struct LocalPlanner {
    pub target_speed: f32,
}

impl Default for LocalPlanner {
    fn default() -> Self {
        Self::new(TARGET_SPEED)
    }
}

impl LocalPlanner {
    pub fn new(target_speed: f32) -> Self {
        Self { target_speed }
    }

    /// One control step toward the first route point past the lookahead
    pub fn run_step(
        &mut self,
        route_plan: &[RoutePoint],
        pose: &Transform,
        forward_speed: f32,
    ) -> Result<(f32, f32, f32)> {
        ensure!(!route_plan.is_empty(), "Cannot follow an empty route plan");

        let goal = route_plan
            .iter()
            .find(|rp| rp.location().distance_2d(&pose.location) > LOOKAHEAD_DISTANCE)
            .unwrap_or_else(|| &route_plan[route_plan.len() - 1]);

        let desired_yaw = pose.location.yaw_to(&goal.location());
        let yaw_error = signed_yaw_delta(desired_yaw, pose.yaw);
        let steer = (yaw_error / STEER_SATURATION_YAW).clamp(-1.0, 1.0);

        let speed_error = self.target_speed - forward_speed;
        let (throttle, brake) = if forward_speed > self.target_speed * OVERSPEED_TOLERANCE {
            (0.0, 0.3)
        } else {
            ((THROTTLE_GAIN * speed_error).clamp(0.0, MAX_THROTTLE), 0.0)
        };

        Ok((throttle, steer, brake))
    }
}

/// Reactive decision: stop for any hazard, otherwise follow the route
pub fn reactive_step(
    vehicle_hazard: bool,
    walker_hazard: bool,
    red_light_ahead: bool,
    planner: &mut LocalPlanner,
    route_plan: &[RoutePoint],
    pose: &Transform,
    forward_speed: f32,
) -> Result<VehicleControl> {
    if vehicle_hazard || walker_hazard || red_light_ahead {
        return Ok(VehicleControl::emergency_stop());
    }

    let (throttle, steer, brake) = planner.run_step(route_plan, pose, forward_speed)?;
    Ok(VehicleControl::new(throttle, steer, brake))
}
