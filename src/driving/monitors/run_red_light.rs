//! Red-light monitor: arms inside a red light's zone, fires on traversal

use anyhow::Result;

use super::{MonitorCtx, MonitorInfo, RuleMonitor};
use crate::driving::types::{ActorId, Position, TrafficLightState};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunRedLightInfo {
    pub violations: u32,
    /// Light whose zone the ego currently occupies while red
    pub engaged_light: Option<ActorId>,
}

/// Remembers where the ego entered the current red-light zone
#[derive(Debug, Default)]
pub struct RunRedLight {
    engaged: Option<(ActorId, Position)>,
    violations: u32,
}

impl RunRedLight {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleMonitor for RunRedLight {
    fn name(&self) -> &'static str {
        "run_red_light"
    }

    fn tick(&mut self, ctx: &MonitorCtx) -> Result<MonitorInfo> {
        let ego_location = ctx.ego.transform.location;

        if let Some((light_id, entry)) = self.engaged {
            let light = ctx
                .world
                .traffic_lights()
                .iter()
                .find(|l| l.id == light_id)
                .copied();

            match light {
                Some(light) if light.state == TrafficLightState::Red => {
                    let outside =
                        light.transform.location.distance_2d(&ego_location) > light.trigger_distance;
                    if outside {
                        // Left the zone while red; traversal means a run
                        if entry.distance_2d(&ego_location) > light.trigger_distance {
                            self.violations += 1;
                        }
                        self.engaged = None;
                    }
                }
                // Light vanished or turned: disarm without a violation
                _ => self.engaged = None,
            }
        }

        if self.engaged.is_none() {
            if let Some(light) = ctx.world.traffic_light_near(ego_location) {
                if light.state == TrafficLightState::Red {
                    self.engaged = Some((light.id, ego_location));
                }
            }
        }

        Ok(MonitorInfo::RunRedLight(RunRedLightInfo {
            violations: self.violations,
            engaged_light: self.engaged.map(|(id, _)| id),
        }))
    }
}
