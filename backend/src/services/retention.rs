use crate::images::SweepReport;
use crate::services::FacilityService;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// Background task that re-runs the image sweep on a fixed interval
pub struct RetentionSweeper {
    service: Arc<FacilityService>,
    interval: Duration,
}

impl RetentionSweeper {
    /// Create a sweeper running every 10 minutes
    pub fn new(service: Arc<FacilityService>) -> Self {
        Self {
            service,
            interval: Duration::from_secs(600),
        }
    }

    /// Set sweep interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start sweeping. Never returns.
    pub async fn start(self) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Retention sweeper started, sweeping every {:?}", self.interval);

        loop {
            interval.tick().await;
            self.run_once().await;
        }
    }

    /// One pass
    pub async fn run_once(&self) -> SweepReport {
        let report = self.service.sweep_images().await;
        debug!(
            "Periodic sweep finished: {} removed, {} retained",
            report.removed.len(),
            report.retained
        );
        report
    }
}
