//! Collision monitor: geometric contact detection with per-actor rearm

use anyhow::Result;
use std::collections::HashMap;

use super::{MonitorCtx, MonitorInfo, RuleMonitor};
use crate::driving::types::ActorId;

/// Center distance below which two actors are in contact
const COLLISION_RADIUS: f32 = 2.0;

/// Seconds of separation before the same actor can register again
const REARM_SECONDS: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CollisionInfo {
    /// Total collisions registered over the session
    pub collisions: u32,
    /// Actor hit this tick, if any
    pub hit_actor: Option<ActorId>,
}

/// Counts contacts, debouncing continuous overlap with one actor
#[derive(Debug, Default)]
pub struct Collision {
    total: u32,
    last_contact: HashMap<ActorId, f32>,
}

impl Collision {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleMonitor for Collision {
    fn name(&self) -> &'static str {
        "collision"
    }

    fn tick(&mut self, ctx: &MonitorCtx) -> Result<MonitorInfo> {
        let now = ctx.timestamp.simulation_time;
        let ego_location = ctx.ego.transform.location;
        let mut hit_actor = None;

        let others = ctx
            .world
            .vehicles()
            .into_iter()
            .chain(ctx.world.walkers())
            .filter(|a| a.id != ctx.ego.id);

        for other in others {
            let distance = other.transform.location.distance_2d(&ego_location);
            if distance >= COLLISION_RADIUS {
                continue;
            }

            let rearmed = self
                .last_contact
                .get(&other.id)
                .is_none_or(|last| now - last > REARM_SECONDS);
            if rearmed {
                self.total += 1;
                hit_actor = Some(other.id);
            }
            // Refreshed every contact tick, so overlap must end before rearming
            self.last_contact.insert(other.id, now);
        }

        Ok(MonitorInfo::Collision(CollisionInfo {
            collisions: self.total,
            hit_actor,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driving::atlas::RoadAtlas;
    use crate::driving::monitors::RouteContext;
    use crate::driving::types::{
        LaneId, Position, RoadId, RoadOption, RoutePoint, Timestamp, Transform, Waypoint,
    };
    use crate::driving::world::WorldState;

    fn route() -> RouteContext {
        RouteContext {
            head: RoutePoint {
                waypoint: Waypoint {
                    transform: Transform::default(),
                    road_id: RoadId(0),
                    lane_id: LaneId(1),
                },
                option: RoadOption::LaneFollow,
            },
            distance_traveled: 0.0,
            route_length: 1.0,
        }
    }

    #[test]
    fn continuous_overlap_counts_once() {
        let atlas = RoadAtlas::new();
        let mut world = WorldState::new();
        let ego_id = world.spawn_vehicle(Transform::default());
        world.spawn_vehicle(Transform::new(Position::new(1.0, 0.0, 0.0), 0.0));
        let ego = *world.actor(ego_id).unwrap();

        let mut monitor = Collision::new();
        for step in 0..5 {
            let ctx = MonitorCtx {
                ego,
                world: &world,
                atlas: &atlas,
                timestamp: Timestamp {
                    step,
                    simulation_time: step as f32 * 0.05,
                },
                route: route(),
            };
            monitor.tick(&ctx).unwrap();
        }

        let ctx = MonitorCtx {
            ego,
            world: &world,
            atlas: &atlas,
            timestamp: Timestamp {
                step: 5,
                simulation_time: 0.25,
            },
            route: route(),
        };
        let MonitorInfo::Collision(info) = monitor.tick(&ctx).unwrap() else {
            panic!("wrong record")
        };
        assert_eq!(info.collisions, 1);
    }

    #[test]
    fn separation_rearms_the_same_actor() {
        let atlas = RoadAtlas::new();
        let mut world = WorldState::new();
        let ego_id = world.spawn_vehicle(Transform::default());
        let other = world.spawn_vehicle(Transform::new(Position::new(1.0, 0.0, 0.0), 0.0));
        let ego = *world.actor(ego_id).unwrap();

        let mut monitor = Collision::new();
        let tick = |monitor: &mut Collision, world: &WorldState, time: f32| {
            let ctx = MonitorCtx {
                ego,
                world,
                atlas: &atlas,
                timestamp: Timestamp {
                    step: 0,
                    simulation_time: time,
                },
                route: route(),
            };
            match monitor.tick(&ctx).unwrap() {
                MonitorInfo::Collision(info) => info,
                _ => panic!("wrong record"),
            }
        };

        assert_eq!(tick(&mut monitor, &world, 0.0).collisions, 1);

        // Move the other vehicle away for longer than the rearm window
        world
            .set_actor_transform(other, Transform::new(Position::new(50.0, 0.0, 0.0), 0.0))
            .unwrap();
        assert_eq!(tick(&mut monitor, &world, 1.0).collisions, 1);

        // Contact again well after separation: a second collision
        world
            .set_actor_transform(other, Transform::new(Position::new(1.0, 0.0, 0.0), 0.0))
            .unwrap();
        assert_eq!(tick(&mut monitor, &world, 10.0).collisions, 2);
    }
}
