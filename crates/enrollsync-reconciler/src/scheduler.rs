//! Flow scheduler
//!
//! Runs each flow on its own timer. A flow never overlaps with itself: the
//! next tick is only taken once the previous run has returned, and ticks
//! missed while a run was active are dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::engine::Reconciler;
use crate::outcome::FlowKind;

/// Timer period of each flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowSchedule {
    pub enroll_every: Duration,
    pub confirm_every: Duration,
    pub retire_every: Duration,
}

impl Default for FlowSchedule {
    fn default() -> Self {
        Self {
            enroll_every: Duration::from_secs(900),
            confirm_every: Duration::from_secs(3600),
            retire_every: Duration::from_secs(1800),
        }
    }
}

impl FlowSchedule {
    #[must_use]
    pub fn period(&self, flow: FlowKind) -> Duration {
        match flow {
            FlowKind::Enroll => self.enroll_every,
            FlowKind::Confirm => self.confirm_every,
            FlowKind::Retire => self.retire_every,
        }
    }
}

/// Drives the three flows until cancelled.
pub struct FlowScheduler {
    reconciler: Arc<Reconciler>,
    schedule: FlowSchedule,
}

impl FlowScheduler {
    #[must_use]
    pub fn new(reconciler: Arc<Reconciler>, schedule: FlowSchedule) -> Self {
        Self {
            reconciler,
            schedule,
        }
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// A run already in progress is allowed to finish. Devices it has not
    /// committed keep their status and are picked up on the next start.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            enroll_every_secs = self.schedule.enroll_every.as_secs(),
            confirm_every_secs = self.schedule.confirm_every.as_secs(),
            retire_every_secs = self.schedule.retire_every.as_secs(),
            "Starting flow scheduler"
        );

        let mut tasks = JoinSet::new();
        for flow in FlowKind::ALL {
            tasks.spawn(run_flow_loop(
                Arc::clone(&self.reconciler),
                flow,
                self.schedule.period(flow),
                shutdown.clone(),
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Flow task terminated abnormally");
            }
        }
        info!("Flow scheduler stopped");
    }
}

async fn run_flow_loop(
    reconciler: Arc<Reconciler>,
    flow: FlowKind,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                info!(flow = %flow, "Shutdown requested, stopping flow");
                break;
            }
            _ = ticker.tick() => {
                match reconciler.run(flow).await {
                    Ok(summary) if summary.failed > 0 => {
                        warn!(
                            flow = %flow,
                            failed = summary.failed,
                            transient_failures = summary.transient_failures,
                            "Flow run finished with device failures"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(
                            flow = %flow,
                            transient = e.is_transient(),
                            error = %e,
                            "Flow run aborted"
                        );
                    }
                }
            }
        }
    }
}
