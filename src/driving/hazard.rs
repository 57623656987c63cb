//! Hazard detection: cone-based scans over live actors
//!
//! Flags vehicles and pedestrians ahead of the ego that justify an
//! emergency stop. Stateless; every call scans the lists it is given.

use super::atlas::RoadAtlas;
use super::geometry::{is_within_distance_ahead, walker_cone_half_angle, yaw_difference};
use super::types::{ActorId, Transform};
use super::world::ActorState;

/// Vehicles heading within this yaw difference count as same-direction
/// traffic; anything wider is oncoming and handled by lane geometry instead
const SAME_DIRECTION_MAX_YAW_DIFF: f32 = 150.0;

/// Half-angle of the forward cone used for vehicle hazards
const VEHICLE_CONE_HALF_ANGLE: f32 = 45.0;

/// Whether any other same-direction vehicle sits in the forward cone
pub fn vehicle_hazard_ahead(
    ego: &Transform,
    ego_id: ActorId,
    vehicles: &[&ActorState],
    proximity_threshold: f32,
) -> bool {
    for other in vehicles {
        if other.id == ego_id {
            continue;
        }

        if yaw_difference(ego.yaw, other.transform.yaw) <= SAME_DIRECTION_MAX_YAW_DIFF
            && is_within_distance_ahead(
                other.transform.location,
                ego.location,
                ego.yaw,
                proximity_threshold,
                VEHICLE_CONE_HALF_ANGLE,
            )
        {
            return true;
        }
    }
    false
}

/// Whether any walker off the sidewalk sits in the distance-scaled cone
pub fn walker_hazard_ahead(
    ego: &Transform,
    walkers: &[&ActorState],
    atlas: &RoadAtlas,
    proximity_threshold: f32,
) -> bool {
    for walker in walkers {
        let location = walker.transform.location;
        if atlas.is_sidewalk(location) {
            continue;
        }

        let distance = location.distance(&ego.location);
        let half_angle = walker_cone_half_angle(distance);
        if is_within_distance_ahead(
            location,
            ego.location,
            ego.yaw,
            proximity_threshold,
            half_angle,
        ) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driving::types::{Position, PROXIMITY_THRESHOLD};
    use crate::driving::world::WorldState;

    fn vehicle_at(world: &mut WorldState, x: f32, y: f32, yaw: f32) -> ActorId {
        world.spawn_vehicle(Transform::new(Position::new(x, y, 0.0), yaw))
    }

    #[test]
    fn same_heading_vehicle_ahead_is_a_hazard() {
        let mut world = WorldState::new();
        let ego_id = vehicle_at(&mut world, 0.0, 0.0, 0.0);
        vehicle_at(&mut world, 5.0, 0.0, 0.0);

        let ego = *world.actor(ego_id).unwrap();
        assert!(vehicle_hazard_ahead(
            &ego.transform,
            ego_id,
            &world.vehicles(),
            PROXIMITY_THRESHOLD
        ));
    }

    #[test]
    fn vehicle_behind_is_not_a_hazard() {
        let mut world = WorldState::new();
        let ego_id = vehicle_at(&mut world, 0.0, 0.0, 0.0);
        vehicle_at(&mut world, -5.0, 0.0, 0.0);

        let ego = *world.actor(ego_id).unwrap();
        assert!(!vehicle_hazard_ahead(
            &ego.transform,
            ego_id,
            &world.vehicles(),
            PROXIMITY_THRESHOLD
        ));
    }

    #[test]
    fn oncoming_vehicle_is_ignored() {
        let mut world = WorldState::new();
        let ego_id = vehicle_at(&mut world, 0.0, 0.0, 0.0);
        // Dead ahead but fully oncoming (180 degrees off)
        vehicle_at(&mut world, 5.0, 0.0, 180.0);

        let ego = *world.actor(ego_id).unwrap();
        assert!(!vehicle_hazard_ahead(
            &ego.transform,
            ego_id,
            &world.vehicles(),
            PROXIMITY_THRESHOLD
        ));
    }

    #[test]
    fn ego_never_hazards_itself() {
        let mut world = WorldState::new();
        let ego_id = vehicle_at(&mut world, 0.0, 0.0, 0.0);
        let ego = *world.actor(ego_id).unwrap();
        assert!(!vehicle_hazard_ahead(
            &ego.transform,
            ego_id,
            &world.vehicles(),
            PROXIMITY_THRESHOLD
        ));
    }

    #[test]
    fn walker_on_road_is_a_hazard_but_sidewalk_is_not() {
        let mut atlas = RoadAtlas::new();
        let a = atlas.add_junction(Position::new(0.0, 0.0, 0.0));
        let b = atlas.add_junction(Position::new(40.0, 0.0, 0.0));
        atlas.add_road(a, b).unwrap();

        let mut world = WorldState::new();
        let ego_id = vehicle_at(&mut world, 0.0, 0.0, 0.0);
        let ego = *world.actor(ego_id).unwrap();

        // On the carriageway, straight ahead
        world.spawn_walker(Transform::new(Position::new(6.0, 0.0, 0.0), 0.0));
        assert!(walker_hazard_ahead(
            &ego.transform,
            &world.walkers(),
            &atlas,
            PROXIMITY_THRESHOLD
        ));

        // The same scan ignores a walker standing in the sidewalk band
        let mut sidewalk_world = WorldState::new();
        sidewalk_world.spawn_walker(Transform::new(Position::new(6.0, 3.0, 0.0), 0.0));
        assert!(!walker_hazard_ahead(
            &ego.transform,
            &sidewalk_world.walkers(),
            &atlas,
            PROXIMITY_THRESHOLD
        ));
    }
}
