//! Blocked monitor: flags a vehicle stuck below crawl speed for too long

use anyhow::Result;

use super::{MonitorCtx, MonitorInfo, RuleMonitor};

/// Speeds below this count as stationary
const SPEED_EPSILON: f32 = 0.1;

/// Seconds of continuous standstill before the vehicle counts as blocked
const BLOCKED_SECONDS: f32 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlockedInfo {
    pub is_blocked: bool,
    /// Continuous seconds below crawl speed, 0 while moving
    pub stationary_seconds: f32,
}

/// Accumulates standstill time across ticks
#[derive(Debug, Default)]
pub struct Blocked {
    below_since: Option<f32>,
}

impl Blocked {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleMonitor for Blocked {
    fn name(&self) -> &'static str {
        "blocked"
    }

    fn tick(&mut self, ctx: &MonitorCtx) -> Result<MonitorInfo> {
        let now = ctx.timestamp.simulation_time;

        if ctx.ego.speed() < SPEED_EPSILON {
            let since = *self.below_since.get_or_insert(now);
            let stationary = now - since;
            Ok(MonitorInfo::Blocked(BlockedInfo {
                is_blocked: stationary >= BLOCKED_SECONDS,
                stationary_seconds: stationary,
            }))
        } else {
            self.below_since = None;
            Ok(MonitorInfo::Blocked(BlockedInfo::default()))
        }
    }
}
