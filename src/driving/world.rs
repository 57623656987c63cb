//! Simulation-world service: live actors, signals and weather
//!
//! The external driver owns and mutates this state between frames; the
//! session only queries it (and flips the ego's light state once per tick).

use anyhow::{Context, Result};
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;

use super::types::{ActorId, Position, TrafficLightState, Transform, VehicleLights};

/// Kind of a live actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorKind {
    Vehicle,
    Walker,
}

/// Snapshot of one live actor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActorState {
    pub id: ActorId,
    pub kind: ActorKind,
    pub transform: Transform,
    /// World-frame velocity vector, units per second
    pub velocity: Position,
    pub lights: VehicleLights,
}

impl ActorState {
    /// Scalar projection of velocity onto the heading unit vector
    pub fn forward_speed(&self) -> f32 {
        let (fx, fy) = self.transform.forward_vector();
        self.velocity.x * fx + self.velocity.y * fy
    }

    pub fn speed(&self) -> f32 {
        let v = self.velocity;
        (v.x * v.x + v.y * v.y + v.z * v.z).sqrt()
    }
}

/// A traffic light with a circular trigger zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficLight {
    pub id: ActorId,
    pub transform: Transform,
    pub trigger_distance: f32,
    pub state: TrafficLightState,
}

/// A stop sign with a circular trigger zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopSign {
    pub id: ActorId,
    pub transform: Transform,
    pub trigger_distance: f32,
}

/// Mutable world snapshot the session ticks against
#[derive(Default)]
pub struct WorldState {
    actors: BTreeMap<ActorId, ActorState>,
    traffic_lights: Vec<TrafficLight>,
    stop_signs: Vec<StopSign>,
    /// Sun altitude in degrees; negative is below the horizon
    sun_altitude: f32,
    next_id: usize,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_actor_id(&mut self) -> ActorId {
        let id = ActorId(self.next_id);
        self.next_id += 1;
        id
    }

    fn spawn_actor(&mut self, kind: ActorKind, transform: Transform) -> ActorId {
        let id = self.next_actor_id();
        self.actors.insert(
            id,
            ActorState {
                id,
                kind,
                transform,
                velocity: Position::default(),
                lights: VehicleLights::Off,
            },
        );
        id
    }

    pub fn spawn_vehicle(&mut self, transform: Transform) -> ActorId {
        self.spawn_actor(ActorKind::Vehicle, transform)
    }

    pub fn spawn_walker(&mut self, transform: Transform) -> ActorId {
        self.spawn_actor(ActorKind::Walker, transform)
    }

    pub fn add_traffic_light(
        &mut self,
        transform: Transform,
        trigger_distance: f32,
        state: TrafficLightState,
    ) -> ActorId {
        let id = self.next_actor_id();
        self.traffic_lights.push(TrafficLight {
            id,
            transform,
            trigger_distance,
            state,
        });
        id
    }

    pub fn add_stop_sign(&mut self, transform: Transform, trigger_distance: f32) -> ActorId {
        let id = self.next_actor_id();
        self.stop_signs.push(StopSign {
            id,
            transform,
            trigger_distance,
        });
        id
    }

    pub fn actor(&self, id: ActorId) -> Option<&ActorState> {
        self.actors.get(&id)
    }

    pub fn is_alive(&self, id: ActorId) -> bool {
        self.actors.contains_key(&id)
    }

    /// Remove an actor; returns whether it existed
    pub fn destroy_actor(&mut self, id: ActorId) -> bool {
        self.actors.remove(&id).is_some()
    }

    pub fn set_actor_transform(&mut self, id: ActorId, transform: Transform) -> Result<()> {
        self.actors
            .get_mut(&id)
            .with_context(|| format!("Actor {:?} not found", id))?
            .transform = transform;
        Ok(())
    }

    pub fn set_actor_velocity(&mut self, id: ActorId, velocity: Position) -> Result<()> {
        self.actors
            .get_mut(&id)
            .with_context(|| format!("Actor {:?} not found", id))?
            .velocity = velocity;
        Ok(())
    }

    pub fn set_vehicle_lights(&mut self, id: ActorId, lights: VehicleLights) -> Result<()> {
        self.actors
            .get_mut(&id)
            .with_context(|| format!("Actor {:?} not found", id))?
            .lights = lights;
        Ok(())
    }

    /// All live vehicles, ordered by id
    pub fn vehicles(&self) -> Vec<&ActorState> {
        self.actors
            .values()
            .filter(|a| a.kind == ActorKind::Vehicle)
            .collect()
    }

    /// All live walkers, ordered by id
    pub fn walkers(&self) -> Vec<&ActorState> {
        self.actors
            .values()
            .filter(|a| a.kind == ActorKind::Walker)
            .collect()
    }

    pub fn traffic_lights(&self) -> &[TrafficLight] {
        &self.traffic_lights
    }

    pub fn stop_signs(&self) -> &[StopSign] {
        &self.stop_signs
    }

    pub fn set_traffic_light_state(
        &mut self,
        id: ActorId,
        state: TrafficLightState,
    ) -> Result<()> {
        self.traffic_lights
            .iter_mut()
            .find(|l| l.id == id)
            .with_context(|| format!("Traffic light {:?} not found", id))?
            .state = state;
        Ok(())
    }

    /// Nearest traffic light whose trigger zone contains the location
    pub fn traffic_light_near(&self, location: Position) -> Option<&TrafficLight> {
        self.traffic_lights
            .iter()
            .filter(|l| l.transform.location.distance_2d(&location) <= l.trigger_distance)
            .min_by_key(|l| OrderedFloat(l.transform.location.distance_2d(&location)))
    }

    /// Nearest stop sign whose trigger zone contains the location
    pub fn stop_sign_near(&self, location: Position) -> Option<&StopSign> {
        self.stop_signs
            .iter()
            .filter(|s| s.transform.location.distance_2d(&location) <= s.trigger_distance)
            .min_by_key(|s| OrderedFloat(s.transform.location.distance_2d(&location)))
    }

    pub fn sun_altitude(&self) -> f32 {
        self.sun_altitude
    }

    pub fn set_sun_altitude(&mut self, degrees: f32) {
        self.sun_altitude = degrees;
    }
}
