use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::{DashboardReport, DashboardSnapshot, ReportingClock, SnapshotSource};
use crate::workflows::courrier::StoreError;

/// Background task recomputing the dashboard report on a fixed interval.
///
/// Each successful refresh replaces the published report wholesale. A failed
/// fetch keeps the previous report. Fetches run on the blocking pool since
/// sources read synchronously. The task stops when the poller is dropped.
pub struct DashboardPoller {
    receiver: watch::Receiver<Option<DashboardReport>>,
    handle: JoinHandle<()>,
}

impl DashboardPoller {
    /// Spawn on the current tokio runtime. The first refresh runs immediately.
    pub fn spawn<P>(source: Arc<P>, offset: FixedOffset, period: Duration) -> Self
    where
        P: SnapshotSource + 'static,
    {
        let (sender, receiver) = watch::channel(None);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let fetch = Arc::clone(&source);
                match tokio::task::spawn_blocking(move || fetch.snapshot()).await {
                    Ok(result) => publish(result, offset, &sender),
                    Err(err) => {
                        warn!(error = %err, "dashboard fetch aborted; keeping previous report");
                    }
                }
            }
        });

        Self { receiver, handle }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<DashboardReport>> {
        self.receiver.clone()
    }

    /// Last published report; `None` until the first successful refresh.
    pub fn latest(&self) -> Option<DashboardReport> {
        self.receiver.borrow().clone()
    }
}

impl Drop for DashboardPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn publish(
    fetched: Result<DashboardSnapshot, StoreError>,
    offset: FixedOffset,
    sender: &watch::Sender<Option<DashboardReport>>,
) {
    match fetched {
        Ok(snapshot) => {
            let clock = ReportingClock::new(Utc::now(), offset);
            let report = DashboardReport::compute(&snapshot, &clock);
            debug!(
                courriers = snapshot.courriers.len(),
                late = report.stats.courriers_late,
                alerts = report.alerts.len(),
                "dashboard refreshed"
            );
            sender.send_replace(Some(report));
        }
        Err(err) => {
            warn!(error = %err, "dashboard refresh failed; keeping previous report");
        }
    }
}
