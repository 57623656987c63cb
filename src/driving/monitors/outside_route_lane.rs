//! Outside-route-lane monitor: meters driven off the planned lane

use anyhow::Result;

use super::{MonitorCtx, MonitorInfo, RuleMonitor};
use crate::driving::types::LANE_HALF_WIDTH;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OutsideRouteLaneInfo {
    /// Off the planned lane this tick, for either reason below
    pub outside_lane: bool,
    /// Not on any drivable lane at all
    pub off_road: bool,
    /// Cumulative meters traveled while outside the route lane
    pub meters_off_route: f32,
}

/// Accumulates off-route driving distance
#[derive(Debug, Default)]
pub struct OutsideRouteLane {
    meters_off_route: f32,
}

impl OutsideRouteLane {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleMonitor for OutsideRouteLane {
    fn name(&self) -> &'static str {
        "outside_route_lane"
    }

    fn tick(&mut self, ctx: &MonitorCtx) -> Result<MonitorInfo> {
        let location = ctx.ego.transform.location;

        let off_road = !ctx.atlas.is_on_road(location);
        // Distance to the route's own road, so a parallel lane still counts
        // as outside even though it is drivable
        let wrong_lane = ctx
            .atlas
            .distance_to_road(ctx.route.head.waypoint.road_id, location)
            .is_none_or(|d| d > LANE_HALF_WIDTH);

        let outside_lane = off_road || wrong_lane;
        if outside_lane {
            self.meters_off_route += ctx.route.distance_traveled;
        }

        Ok(MonitorInfo::OutsideRouteLane(OutsideRouteLaneInfo {
            outside_lane,
            off_road,
            meters_off_route: self.meters_off_route,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driving::atlas::RoadAtlas;
    use crate::driving::monitors::RouteContext;
    use crate::driving::types::{
        Position, RoadOption, RoutePoint, Timestamp, Transform,
    };
    use crate::driving::world::WorldState;

    #[test]
    fn off_route_driving_accumulates_meters() {
        let mut atlas = RoadAtlas::new();
        let a = atlas.add_junction(Position::new(0.0, 0.0, 0.0));
        let b = atlas.add_junction(Position::new(100.0, 0.0, 0.0));
        let road = atlas.add_road(a, b).unwrap();
        let head_wp = atlas.waypoint_at(Position::new(10.0, 0.0, 0.0)).unwrap();
        assert_eq!(head_wp.road_id, road);

        let mut world = WorldState::new();
        let ego = world.spawn_vehicle(Transform::new(Position::new(5.0, 0.0, 0.0), 0.0));

        let mut monitor = OutsideRouteLane::new();
        let mut tick = |world: &WorldState, traveled: f32| {
            let ctx = MonitorCtx {
                ego: *world.actor(ego).unwrap(),
                world,
                atlas: &atlas,
                timestamp: Timestamp::default(),
                route: RouteContext {
                    head: RoutePoint {
                        waypoint: head_wp,
                        option: RoadOption::LaneFollow,
                    },
                    distance_traveled: traveled,
                    route_length: 100.0,
                },
            };
            match monitor.tick(&ctx).unwrap() {
                MonitorInfo::OutsideRouteLane(info) => info,
                _ => panic!("wrong record"),
            }
        };

        // On the route lane: nothing accumulates
        let info = tick(&world, 2.0);
        assert!(!info.outside_lane);
        assert_eq!(info.meters_off_route, 0.0);

        // Far off the carriageway: off-road and accumulating
        world
            .set_actor_transform(ego, Transform::new(Position::new(5.0, 30.0, 0.0), 0.0))
            .unwrap();
        let info = tick(&world, 2.0);
        assert!(info.outside_lane);
        assert!(info.off_road);
        assert_eq!(info.meters_off_route, 2.0);

        let info = tick(&world, 3.0);
        assert_eq!(info.meters_off_route, 5.0);
    }
}
