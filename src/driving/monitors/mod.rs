//! Traffic-rule compliance monitors
//!
//! Seven independent stateful checkers share one capability and run in a
//! fixed order every tick. The suite merges their records into a single
//! name-keyed report, synthesizes the route-completion record, and adjusts
//! the ego's light state from the sun altitude.

mod blocked;
mod collision;
mod encounter_light;
mod outside_route_lane;
mod route_deviation;
mod run_red_light;
mod run_stop_sign;

pub use blocked::{Blocked, BlockedInfo};
pub use collision::{Collision, CollisionInfo};
pub use encounter_light::{EncounterLight, EncounterLightInfo};
pub use outside_route_lane::{OutsideRouteLane, OutsideRouteLaneInfo};
pub use route_deviation::{RouteDeviation, RouteDeviationInfo};
pub use run_red_light::{RunRedLight, RunRedLightInfo};
pub use run_stop_sign::{RunStopSign, RunStopSignInfo};

use anyhow::{Context, Result};
use std::collections::BTreeMap;

use super::atlas::RoadAtlas;
use super::types::{ActorId, RoutePoint, Timestamp, VehicleLights};
use super::world::{ActorState, WorldState};

/// Route-tracker outputs the monitors read this tick
#[derive(Debug, Clone, Copy)]
pub struct RouteContext {
    pub head: RoutePoint,
    pub distance_traveled: f32,
    pub route_length: f32,
}

/// Everything a monitor may consult during one tick
pub struct MonitorCtx<'a> {
    pub ego: ActorState,
    pub world: &'a WorldState,
    pub atlas: &'a RoadAtlas,
    pub timestamp: Timestamp,
    pub route: RouteContext,
}

/// The one capability every monitor implements
pub trait RuleMonitor {
    fn name(&self) -> &'static str;
    fn tick(&mut self, ctx: &MonitorCtx) -> Result<MonitorInfo>;
}

/// Synthesized progress record attached to every report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteCompletionInfo {
    pub step: u64,
    pub simulation_time: f32,
    pub route_completed_in_m: f32,
    pub route_length_in_m: f32,
    pub is_route_completed: bool,
}

/// Latest info record emitted by one monitor
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorInfo {
    Blocked(BlockedInfo),
    Collision(CollisionInfo),
    RunRedLight(RunRedLightInfo),
    EncounterLight(EncounterLightInfo),
    RunStopSign(RunStopSignInfo),
    OutsideRouteLane(OutsideRouteLaneInfo),
    RouteDeviation(RouteDeviationInfo),
    RouteCompletion(RouteCompletionInfo),
}

/// Merged per-tick compliance report, keyed by monitor name
#[derive(Debug, Clone, Default)]
pub struct ComplianceReport {
    records: BTreeMap<&'static str, MonitorInfo>,
}

impl ComplianceReport {
    pub fn get(&self, name: &str) -> Option<&MonitorInfo> {
        self.records.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.records.keys().copied()
    }

    pub fn route_completion(&self) -> Option<&RouteCompletionInfo> {
        match self.records.get("route_completion") {
            Some(MonitorInfo::RouteCompletion(info)) => Some(info),
            _ => None,
        }
    }

    pub fn blocked(&self) -> Option<&BlockedInfo> {
        match self.records.get("blocked") {
            Some(MonitorInfo::Blocked(info)) => Some(info),
            _ => None,
        }
    }

    pub fn collision(&self) -> Option<&CollisionInfo> {
        match self.records.get("collision") {
            Some(MonitorInfo::Collision(info)) => Some(info),
            _ => None,
        }
    }

    pub fn outside_route_lane(&self) -> Option<&OutsideRouteLaneInfo> {
        match self.records.get("outside_route_lane") {
            Some(MonitorInfo::OutsideRouteLane(info)) => Some(info),
            _ => None,
        }
    }

    pub fn route_deviation(&self) -> Option<&RouteDeviationInfo> {
        match self.records.get("route_deviation") {
            Some(MonitorInfo::RouteDeviation(info)) => Some(info),
            _ => None,
        }
    }
}

/// Drives the monitors in their fixed evaluation order
pub struct ComplianceSuite {
    monitors: Vec<Box<dyn RuleMonitor>>,
}

impl Default for ComplianceSuite {
    fn default() -> Self {
        Self::new()
    }
}

impl ComplianceSuite {
    pub fn new() -> Self {
        Self {
            monitors: vec![
                Box::new(Blocked::new()),
                Box::new(Collision::new()),
                Box::new(RunRedLight::new()),
                Box::new(EncounterLight::new()),
                Box::new(RunStopSign::new()),
                Box::new(OutsideRouteLane::new()),
                Box::new(RouteDeviation::new()),
            ],
        }
    }

    /// Run every monitor once and merge the records
    ///
    /// A failing monitor fails the whole tick; partial reports are unsafe
    /// for rule evaluation. Also flips the ego's lights from the sun angle.
    pub fn tick(
        &mut self,
        world: &mut WorldState,
        atlas: &RoadAtlas,
        ego_id: ActorId,
        timestamp: Timestamp,
        route: RouteContext,
        completion: RouteCompletionInfo,
    ) -> Result<ComplianceReport> {
        let ego = *world
            .actor(ego_id)
            .context("Ego vehicle missing from world")?;

        let mut report = ComplianceReport::default();
        {
            let ctx = MonitorCtx {
                ego,
                world,
                atlas,
                timestamp,
                route,
            };
            for monitor in &mut self.monitors {
                let info = monitor.tick(&ctx)?;
                report.records.insert(monitor.name(), info);
            }
        }
        report
            .records
            .insert("route_completion", MonitorInfo::RouteCompletion(completion));

        let lights = if world.sun_altitude() < 0.0 {
            VehicleLights::PositionLowBeam
        } else {
            VehicleLights::Off
        };
        world.set_vehicle_lights(ego_id, lights)?;

        Ok(report)
    }
}
