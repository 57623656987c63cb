//! Vehicle session orchestrator
//!
//! Composes the route tracker, compliance suite, hazard scan and reactive
//! controller around one externally owned vehicle actor. Collaborators are
//! passed in by reference per call; the session never holds the world.

use anyhow::{ensure, Context, Result};
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::atlas::RoadAtlas;
use super::control::{reactive_step, LocalPlanner};
use super::hazard::{vehicle_hazard_ahead, walker_hazard_ahead};
use super::monitors::{ComplianceReport, ComplianceSuite, RouteCompletionInfo, RouteContext};
use super::plan::GpsPoint;
use super::route::RouteTracker;
use super::types::{
    ActorId, Position, RoadId, RoadOption, RoutePoint, Timestamp, TrafficLightState, Transform,
    VehicleControl, PROXIMITY_THRESHOLD,
};
use super::world::WorldState;

/// One controlled vehicle's driving task
///
/// Lifecycle: constructed with the route traced to every target, then
/// tick-driven, then cleaned exactly once (further ticks are rejected).
pub struct Session {
    ego: ActorId,
    route: RouteTracker,
    suite: ComplianceSuite,
    planner: LocalPlanner,
    spawn_transforms: Vec<(RoadId, Transform)>,
    endless: bool,
    rng: StdRng,
    active: bool,
    last_report: Option<ComplianceReport>,
}

impl Session {
    /// Construct a session around an existing vehicle actor and trace the
    /// route through every target in order
    ///
    /// An empty target list seeds the route with random targets instead,
    /// which requires at least one usable spawn pose.
    pub fn attach(
        world: &WorldState,
        atlas: &RoadAtlas,
        vehicle: ActorId,
        target_transforms: Vec<Transform>,
        spawn_transforms: Vec<(RoadId, Transform)>,
        endless: bool,
    ) -> Result<Self> {
        Self::attach_inner(
            world,
            atlas,
            vehicle,
            target_transforms,
            spawn_transforms,
            endless,
            StdRng::from_os_rng(),
        )
    }

    /// Like [`Session::attach`] but with a seeded RNG for reproducible runs
    pub fn attach_seeded(
        world: &WorldState,
        atlas: &RoadAtlas,
        vehicle: ActorId,
        target_transforms: Vec<Transform>,
        spawn_transforms: Vec<(RoadId, Transform)>,
        endless: bool,
        seed: u64,
    ) -> Result<Self> {
        Self::attach_inner(
            world,
            atlas,
            vehicle,
            target_transforms,
            spawn_transforms,
            endless,
            StdRng::seed_from_u64(seed),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn attach_inner(
        world: &WorldState,
        atlas: &RoadAtlas,
        vehicle: ActorId,
        target_transforms: Vec<Transform>,
        spawn_transforms: Vec<(RoadId, Transform)>,
        endless: bool,
        mut rng: StdRng,
    ) -> Result<Self> {
        let ego = world
            .actor(vehicle)
            .with_context(|| format!("Vehicle {:?} not found in world", vehicle))?;
        let start = ego.transform.location;

        let mut route = RouteTracker::new(start);
        route.seed(atlas, start, &target_transforms)?;
        if target_transforms.is_empty() {
            route.seed_random(atlas, start, &spawn_transforms, &mut rng)?;
        }

        debug!(
            "session attached to {:?}: {} targets, route length {:.1}",
            vehicle,
            route.target_count(),
            route.route_length()
        );

        Ok(Self {
            ego: vehicle,
            route,
            suite: ComplianceSuite::new(),
            planner: LocalPlanner::default(),
            spawn_transforms,
            endless,
            rng,
            active: true,
            last_report: None,
        })
    }

    /// One frame-locked simulation step
    ///
    /// Advances the route, checks completion (extending endless sessions),
    /// runs the compliance suite, and returns the merged report. Every
    /// fallible collaborator call runs on staged data first, so a failure
    /// leaves the session untouched.
    pub fn tick(
        &mut self,
        world: &mut WorldState,
        atlas: &RoadAtlas,
        timestamp: Timestamp,
    ) -> Result<ComplianceReport> {
        ensure!(self.active, "Session has been cleaned");
        let ego = *world
            .actor(self.ego)
            .context("Ego vehicle missing from world")?;
        let ego_location = ego.transform.location;

        let staged_advance = self.route.plan_advance(ego_location);
        let mut route_completed = self
            .route
            .would_complete_after(staged_advance.traveled(), ego_location);

        let staged_target = if route_completed && self.endless {
            let staged = self.route.plan_random_target(
                atlas,
                ego_location,
                &self.spawn_transforms,
                &mut self.rng,
            )?;
            route_completed = false;
            Some(staged)
        } else {
            None
        };

        // All fallible planning is done; commit in order
        let distance_traveled = self.route.apply_advance(staged_advance);
        if let Some((trace, target)) = staged_target {
            self.route.commit_target(trace, target);
        }

        let head = *self.route.head()?;
        let report = self.suite.tick(
            world,
            atlas,
            self.ego,
            timestamp,
            RouteContext {
                head,
                distance_traveled,
                route_length: self.route.route_length(),
            },
            RouteCompletionInfo {
                step: timestamp.step,
                simulation_time: timestamp.simulation_time,
                route_completed_in_m: self.route.route_completed(),
                route_length_in_m: self.route.route_length(),
                is_route_completed: route_completed,
            },
        )?;

        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Reactive fallback command toward the current route
    ///
    /// Emergency-stops for any vehicle/pedestrian hazard or a red light
    /// ahead; otherwise delegates to the local planner.
    pub fn control_to_target(
        &mut self,
        world: &WorldState,
        atlas: &RoadAtlas,
    ) -> Result<VehicleControl> {
        ensure!(self.active, "Session has been cleaned");
        let ego = *world
            .actor(self.ego)
            .context("Ego vehicle missing from world")?;

        let vehicle_hazard = vehicle_hazard_ahead(
            &ego.transform,
            self.ego,
            &world.vehicles(),
            PROXIMITY_THRESHOLD,
        );
        let walker_hazard =
            walker_hazard_ahead(&ego.transform, &world.walkers(), atlas, PROXIMITY_THRESHOLD);
        let red_light_ahead = world
            .traffic_light_near(ego.transform.location)
            .is_some_and(|light| light.state == TrafficLightState::Red);

        reactive_step(
            vehicle_hazard,
            walker_hazard,
            red_light_ahead,
            &mut self.planner,
            self.route.route_plan(),
            &ego.transform,
            ego.forward_speed(),
        )
    }

    /// Release the owned vehicle actor and end the session
    ///
    /// Idempotent, and safe to call before the first tick.
    pub fn clean(&mut self, world: &mut WorldState) {
        if !self.active {
            return;
        }
        if !world.destroy_actor(self.ego) {
            debug!("ego {:?} was already gone at clean", self.ego);
        }
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn vehicle(&self) -> ActorId {
        self.ego
    }

    /// Remaining route, head first
    pub fn route_plan(&self) -> &[RoutePoint] {
        self.route.route_plan()
    }

    pub fn global_plan_gps(&self) -> &[(GpsPoint, RoadOption)] {
        self.route.global_plan_gps()
    }

    pub fn global_plan_world_coord(&self) -> &[(Position, RoadOption)] {
        self.route.global_plan_world_coord()
    }

    pub fn route_length(&self) -> f32 {
        self.route.route_length()
    }

    pub fn route_completed(&self) -> f32 {
        self.route.route_completed()
    }

    pub fn destination_transform(&self) -> Result<&Transform> {
        self.route.destination_transform()
    }

    pub fn next_route_point(&self) -> Result<&RoutePoint> {
        self.route.next_route_point()
    }

    /// Synthesized head pose for lateral-control reference
    pub fn route_transform(&self) -> Result<Transform> {
        self.route.route_transform()
    }

    /// Report from the most recent tick
    pub fn info(&self) -> Option<&ComplianceReport> {
        self.last_report.as_ref()
    }
}
