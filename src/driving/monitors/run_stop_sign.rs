//! Stop-sign monitor: requires a full stop inside each sign's zone

use anyhow::Result;

use super::{MonitorCtx, MonitorInfo, RuleMonitor};
use crate::driving::types::ActorId;

/// Speeds below this count as a full stop
const STOP_SPEED_EPSILON: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RunStopSignInfo {
    pub violations: u32,
    /// Sign zone the ego currently occupies
    pub engaged_sign: Option<ActorId>,
    /// Whether a full stop has been registered for the current zone
    pub stopped: bool,
}

/// Remembers the active sign zone and whether the ego stopped in it
#[derive(Debug, Default)]
pub struct RunStopSign {
    engaged: Option<ActorId>,
    has_stopped: bool,
    violations: u32,
}

impl RunStopSign {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleMonitor for RunStopSign {
    fn name(&self) -> &'static str {
        "run_stop_sign"
    }

    fn tick(&mut self, ctx: &MonitorCtx) -> Result<MonitorInfo> {
        let ego_location = ctx.ego.transform.location;
        let current = ctx.world.stop_sign_near(ego_location).map(|s| s.id);

        match (self.engaged, current) {
            (Some(engaged), Some(current_id)) if engaged == current_id => {
                if ctx.ego.speed() < STOP_SPEED_EPSILON {
                    self.has_stopped = true;
                }
            }
            (Some(_), _) => {
                // Left the previous zone; rolling through it is a violation
                if !self.has_stopped {
                    self.violations += 1;
                }
                self.engaged = current;
                self.has_stopped = ctx.ego.speed() < STOP_SPEED_EPSILON;
            }
            (None, Some(current_id)) => {
                self.engaged = Some(current_id);
                self.has_stopped = ctx.ego.speed() < STOP_SPEED_EPSILON;
            }
            (None, None) => {}
        }

        Ok(MonitorInfo::RunStopSign(RunStopSignInfo {
            violations: self.violations,
            engaged_sign: self.engaged,
            stopped: self.has_stopped,
        }))
    }
}
