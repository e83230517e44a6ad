//! Dashboard aggregation over a full snapshot of courriers, users and services.
//!
//! Everything here is a pure fold at an explicit instant and reporting
//! offset; [`poller`] refreshes the published report on a schedule.

mod activity;
mod alerts;
pub mod poller;
mod stats;
pub mod views;

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::courrier::{
    Courrier, CourrierFilter, CourrierStore, Service, ServiceDirectory, StoreError, User,
    UserDirectory,
};

pub use activity::{ACTIVITY_DISPLAYED, ACTIVITY_WINDOW, UNKNOWN_AUTHOR};
pub use poller::DashboardPoller;
pub use views::{
    ActivityEntry, AlertKind, AlertSeverity, DashboardAlert, DashboardReport, DashboardStats,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub courriers: Vec<Courrier>,
    pub users: Vec<User>,
    pub services: Vec<Service>,
}

/// The instant a report is computed at and the offset "today" is judged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingClock {
    pub now: DateTime<Utc>,
    pub offset: FixedOffset,
}

impl ReportingClock {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now, offset }
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.local_date(self.now)
    }

    /// Start of the local day containing `now`, as a UTC instant.
    pub fn local_midnight(&self) -> DateTime<Utc> {
        let midnight = self.today().and_time(chrono::NaiveTime::MIN);
        let shift = Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&(midnight - shift))
    }
}

impl DashboardReport {
    pub fn compute(snapshot: &DashboardSnapshot, clock: &ReportingClock) -> Self {
        let stats = stats::compute_stats(snapshot, clock);
        let alerts = alerts::compute_alerts(snapshot, &stats);
        let recent_activity = activity::recent_activity(snapshot, clock);

        Self {
            generated_at: clock.now,
            stats,
            alerts,
            recent_activity,
        }
    }
}

/// Where the poller fetches a fresh snapshot from.
pub trait SnapshotSource: Send + Sync {
    fn snapshot(&self) -> Result<DashboardSnapshot, StoreError>;
}

/// Snapshot assembled from the courrier store and the directories.
pub struct CollaboratorSnapshot<S, D> {
    store: Arc<S>,
    directory: Arc<D>,
}

impl<S, D> CollaboratorSnapshot<S, D> {
    pub fn new(store: Arc<S>, directory: Arc<D>) -> Self {
        Self { store, directory }
    }
}

impl<S, D> SnapshotSource for CollaboratorSnapshot<S, D>
where
    S: CourrierStore,
    D: UserDirectory + ServiceDirectory,
{
    fn snapshot(&self) -> Result<DashboardSnapshot, StoreError> {
        Ok(DashboardSnapshot {
            courriers: self.store.list(&CourrierFilter::default())?,
            users: self.directory.users()?,
            services: self.directory.services()?,
        })
    }
}
