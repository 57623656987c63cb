//! Route-deviation monitor: distance from the live route head

use anyhow::Result;

use super::{MonitorCtx, MonitorInfo, RuleMonitor};

/// Distance from the route head beyond which the vehicle has deviated
const DEVIATION_THRESHOLD: f32 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RouteDeviationInfo {
    pub is_deviated: bool,
    pub distance_from_route: f32,
    /// Distinct deviation events (rising edges)
    pub deviations: u32,
}

/// Latches deviation events on the rising edge
#[derive(Debug, Default)]
pub struct RouteDeviation {
    was_deviated: bool,
    deviations: u32,
}

impl RouteDeviation {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleMonitor for RouteDeviation {
    fn name(&self) -> &'static str {
        "route_deviation"
    }

    fn tick(&mut self, ctx: &MonitorCtx) -> Result<MonitorInfo> {
        let distance = ctx
            .ego
            .transform
            .location
            .distance_2d(&ctx.route.head.location());
        let is_deviated = distance > DEVIATION_THRESHOLD;

        if is_deviated && !self.was_deviated {
            self.deviations += 1;
        }
        self.was_deviated = is_deviated;

        Ok(MonitorInfo::RouteDeviation(RouteDeviationInfo {
            is_deviated,
            distance_from_route: distance,
            deviations: self.deviations,
        }))
    }
}
