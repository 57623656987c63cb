//! Route tracker: progress bookkeeping over the planned global route
//!
//! Owns the live route, the visited-target list, cumulative completion
//! metrics and the downsampled plan exports. Advancing is split into a pure
//! planning step and a mutating commit so a tick can stage every fallible
//! collaborator call before touching state.

use anyhow::{bail, Context, Result};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use super::atlas::RoadAtlas;
use super::plan::{downsample_route, route_to_gps, GpsPoint};
use super::types::{Position, RoadId, RoadOption, RoutePoint, Transform};

/// Scan window: truncation stops once this much route has been measured
pub const TRUNCATE_MAX_DISTANCE: f32 = 50.0;

/// Only points at most this far from the vehicle can become the new head
pub const TRUNCATE_MIN_DISTANCE: f32 = 7.0;

/// Completion requires this fraction of the route length consumed
pub const COMPLETION_PERCENTAGE: f32 = 0.99;

/// ... and the vehicle within this distance of the final target
pub const COMPLETION_DISTANCE: f32 = 10.0;

/// Below this head-to-anchor distance the head's own yaw is reused
const HEADING_REUSE_EPSILON: f32 = 0.1;

/// Every Nth traced point survives into the downsampled plan exports
const DOWNSAMPLE_STEP: usize = 50;

/// Routes seeded without explicit targets grow to at least this length
const SEED_ROUTE_LENGTH: f32 = 1000.0;

/// How far ahead of the vehicle the first random target is placed
const FIRST_TARGET_STEP: f32 = 6.0;

/// Staged result of one truncation scan; commit via [`RouteTracker::apply_advance`]
#[derive(Debug, Clone, Copy)]
pub struct RouteAdvance {
    closest_idx: usize,
    traveled: f32,
}

impl RouteAdvance {
    pub fn traveled(&self) -> f32 {
        self.traveled
    }
}

/// Tracks the remaining route and everything consumed so far
pub struct RouteTracker {
    global_route: Vec<RoutePoint>,
    targets: Vec<Transform>,
    route_length: f32,
    route_completed: f32,
    last_anchor: Position,
    plan_gps: Vec<(GpsPoint, RoadOption)>,
    plan_world: Vec<(Position, RoadOption)>,
}

impl RouteTracker {
    pub fn new(start_location: Position) -> Self {
        Self {
            global_route: Vec::new(),
            targets: Vec::new(),
            route_length: 0.0,
            route_completed: 0.0,
            last_anchor: start_location,
            plan_gps: Vec::new(),
            plan_world: Vec::new(),
        }
    }

    /// Sum of consecutive-point distances over a route slice
    pub fn compute_route_length(route: &[RoutePoint]) -> f32 {
        route
            .windows(2)
            .map(|pair| pair[0].location().distance(&pair[1].location()))
            .sum()
    }

    fn extend_plans(&mut self, trace: &[RoutePoint]) {
        let gps = route_to_gps(trace);
        for idx in downsample_route(trace, DOWNSAMPLE_STEP) {
            self.plan_gps.push(gps[idx]);
            self.plan_world.push((trace[idx].location(), trace[idx].option));
        }
    }

    /// Trace the initial route through every target in order
    pub fn seed(
        &mut self,
        atlas: &RoadAtlas,
        start: Position,
        targets: &[Transform],
    ) -> Result<()> {
        let mut current = start;
        for target in targets {
            let trace = atlas.trace_route(current, target.location)?;
            self.route_length += Self::compute_route_length(&trace);
            self.global_route.extend(trace);
            current = target.location;
        }
        self.targets.extend_from_slice(targets);

        let full: Vec<RoutePoint> = self.global_route.clone();
        self.extend_plans(&full);
        Ok(())
    }

    /// Keep appending random targets until the route reaches the seed length
    pub fn seed_random(
        &mut self,
        atlas: &RoadAtlas,
        vehicle_location: Position,
        spawn_transforms: &[(RoadId, Transform)],
        rng: &mut StdRng,
    ) -> Result<()> {
        while self.route_length < SEED_ROUTE_LENGTH {
            self.append_random_target(atlas, vehicle_location, spawn_transforms, rng)?;
        }
        Ok(())
    }

    /// Pick a random target and trace to it, without mutating anything
    ///
    /// The candidate pool is every spawn pose on a road other than the last
    /// target's road; with no targets yet, the pose a short step ahead of
    /// the vehicle along its lane is used instead.
    pub fn plan_random_target(
        &self,
        atlas: &RoadAtlas,
        vehicle_location: Position,
        spawn_transforms: &[(RoadId, Transform)],
        rng: &mut StdRng,
    ) -> Result<(Vec<RoutePoint>, Transform)> {
        let (last_location, new_target) = match self.targets.last() {
            None => {
                let ahead = atlas
                    .waypoint_ahead(vehicle_location, FIRST_TARGET_STEP)
                    .context("No lane ahead of the vehicle for a first target")?;
                (vehicle_location, ahead.transform)
            }
            Some(last) => {
                let last_road = atlas
                    .waypoint_at(last.location)
                    .context("Last target is not near any road")?
                    .road_id;
                let candidates: Vec<Transform> = spawn_transforms
                    .iter()
                    .filter(|(road_id, _)| *road_id != last_road)
                    .map(|(_, transform)| *transform)
                    .collect();
                let choice = *candidates
                    .choose(rng)
                    .context("No spawn pose available for a random target")?;
                (last.location, choice)
            }
        };

        let trace = atlas.trace_route(last_location, new_target.location)?;
        Ok((trace, new_target))
    }

    /// Commit a staged target: extend the route, metrics and plan exports
    pub fn commit_target(&mut self, trace: Vec<RoutePoint>, target: Transform) {
        self.route_length += Self::compute_route_length(&trace);
        self.extend_plans(&trace);
        self.global_route.extend(trace);
        self.targets.push(target);
        debug!(
            "appended target at ({:.1}, {:.1}), route length now {:.1}",
            target.location.x, target.location.y, self.route_length
        );
    }

    /// Pick, trace and commit a random target in one step
    pub fn append_random_target(
        &mut self,
        atlas: &RoadAtlas,
        vehicle_location: Position,
        spawn_transforms: &[(RoadId, Transform)],
        rng: &mut StdRng,
    ) -> Result<()> {
        let (trace, target) =
            self.plan_random_target(atlas, vehicle_location, spawn_transforms, rng)?;
        self.commit_target(trace, target);
        Ok(())
    }

    /// Cumulative-distance truncation scan; pure
    ///
    /// Walks forward from the head accumulating inter-point distance until
    /// the sum exceeds the window, then picks the farthest scanned point
    /// still within reach of the vehicle as the new head.
    pub fn plan_advance(&self, vehicle_location: Position) -> RouteAdvance {
        let mut closest_idx = 0usize;
        let mut farthest_in_range = f32::NEG_INFINITY;
        let mut cumulative_distance = 0.0;

        for i in 1..self.global_route.len() {
            if cumulative_distance > TRUNCATE_MAX_DISTANCE {
                break;
            }

            let cur = self.global_route[i].location();
            let prev = self.global_route[i - 1].location();
            cumulative_distance += cur.distance_2d(&prev);

            let distance = cur.distance_2d(&vehicle_location);
            if distance <= TRUNCATE_MIN_DISTANCE && distance > farthest_in_range {
                farthest_in_range = distance;
                closest_idx = i;
            }
        }

        let traveled = if self.global_route.is_empty() {
            0.0
        } else {
            Self::compute_route_length(&self.global_route[..=closest_idx])
        };

        RouteAdvance {
            closest_idx,
            traveled,
        }
    }

    /// Commit a staged advance: consume the prefix, update the metrics
    ///
    /// The matched point stays on the route as the new head; the anchor
    /// remembers the old head for later heading synthesis.
    pub fn apply_advance(&mut self, advance: RouteAdvance) -> f32 {
        self.route_completed += advance.traveled;

        if advance.closest_idx > 0 {
            self.last_anchor = self.global_route[0].location();
            self.global_route.drain(..advance.closest_idx);
        }

        advance.traveled
    }

    /// Truncate in one step; returns the distance consumed this tick
    pub fn advance(&mut self, vehicle_location: Position) -> f32 {
        let staged = self.plan_advance(vehicle_location);
        self.apply_advance(staged)
    }

    fn completion_state(&self, completed: f32, vehicle_location: Position) -> bool {
        // A zero-length route has no meaningful completion ratio
        if self.route_length <= 0.0 {
            return false;
        }
        let Some(final_target) = self.targets.last() else {
            return false;
        };

        let percentage = completed / self.route_length;
        percentage > COMPLETION_PERCENTAGE
            && vehicle_location.distance(&final_target.location) < COMPLETION_DISTANCE
    }

    /// Whether the route counts as completed right now
    pub fn is_route_completed(&self, vehicle_location: Position) -> bool {
        self.completion_state(self.route_completed, vehicle_location)
    }

    /// Completion as it would read after committing `traveled` more meters
    pub fn would_complete_after(&self, traveled: f32, vehicle_location: Position) -> bool {
        self.completion_state(self.route_completed + traveled, vehicle_location)
    }

    /// Current route head
    ///
    /// An empty route here means truncation consumed everything without the
    /// session ever observing completion, which is a tracking bug.
    pub fn head(&self) -> Result<&RoutePoint> {
        match self.global_route.first() {
            Some(point) => Ok(point),
            None => bail!("Global route exhausted before completion"),
        }
    }

    /// The point the vehicle should steer for next
    pub fn next_route_point(&self) -> Result<&RoutePoint> {
        match self.global_route.len() {
            0 => bail!("Global route exhausted before completion"),
            1 => Ok(&self.global_route[0]),
            _ => Ok(&self.global_route[1]),
        }
    }

    /// Synthesized head pose for lateral-control reference
    ///
    /// Anchored at the last consumed location; below the epsilon the head's
    /// stored yaw is reused so a near-zero vector never defines the heading.
    pub fn route_transform(&self) -> Result<Transform> {
        let head = self.head()?;
        let head_location = head.location();

        let yaw = if head_location.distance(&self.last_anchor) < HEADING_REUSE_EPSILON {
            head.waypoint.transform.yaw
        } else {
            self.last_anchor.yaw_to(&head_location)
        };

        Ok(Transform::new(self.last_anchor, yaw))
    }

    pub fn route_plan(&self) -> &[RoutePoint] {
        &self.global_route
    }

    pub fn global_plan_gps(&self) -> &[(GpsPoint, RoadOption)] {
        &self.plan_gps
    }

    pub fn global_plan_world_coord(&self) -> &[(Position, RoadOption)] {
        &self.plan_world
    }

    pub fn route_length(&self) -> f32 {
        self.route_length
    }

    pub fn route_completed(&self) -> f32 {
        self.route_completed
    }

    pub fn destination_transform(&self) -> Result<&Transform> {
        self.targets.last().context("Session has no target")
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }
}
