//! Encounter-light monitor: counts traffic lights met along the drive

use anyhow::Result;

use super::{MonitorCtx, MonitorInfo, RuleMonitor};
use crate::driving::types::{ActorId, TrafficLightState};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EncounterLightInfo {
    pub encounters: u32,
    /// State of the most recently encountered light
    pub last_state: Option<TrafficLightState>,
}

/// Tracks which light zone the ego currently occupies
#[derive(Debug, Default)]
pub struct EncounterLight {
    inside: Option<ActorId>,
    encounters: u32,
    last_state: Option<TrafficLightState>,
}

impl EncounterLight {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleMonitor for EncounterLight {
    fn name(&self) -> &'static str {
        "encounter_light"
    }

    fn tick(&mut self, ctx: &MonitorCtx) -> Result<MonitorInfo> {
        match ctx.world.traffic_light_near(ctx.ego.transform.location) {
            Some(light) => {
                if self.inside != Some(light.id) {
                    self.encounters += 1;
                    self.inside = Some(light.id);
                }
                self.last_state = Some(light.state);
            }
            None => self.inside = None,
        }

        Ok(MonitorInfo::EncounterLight(EncounterLightInfo {
            encounters: self.encounters,
            last_state: self.last_state,
        }))
    }
}
