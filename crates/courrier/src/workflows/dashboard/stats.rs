use crate::workflows::courrier::is_late;

use super::views::DashboardStats;
use super::{DashboardSnapshot, ReportingClock};

pub(crate) fn compute_stats(
    snapshot: &DashboardSnapshot,
    clock: &ReportingClock,
) -> DashboardStats {
    let total_users = snapshot.users.len();
    let active_users = snapshot.users.iter().filter(|user| user.is_active).count();

    let midnight = clock.local_midnight();

    let mut stats = DashboardStats {
        total_users,
        active_users,
        inactive_users: total_users - active_users,
        total_services: snapshot.services.len(),
        ..DashboardStats::default()
    };

    let mut closed = 0usize;
    for courrier in &snapshot.courriers {
        if courrier.created_at >= midnight && courrier.created_at < clock.now {
            stats.courriers_today += 1;
        }
        if courrier.statut.is_open() {
            stats.courriers_pending += 1;
        }
        if courrier.statut.is_closed() {
            closed += 1;
        }
        if is_late(courrier, clock.now, clock.offset) {
            stats.courriers_late += 1;
        }
    }

    stats.completion_rate = completion_rate(closed, snapshot.courriers.len());
    stats
}

/// Rounded percentage of closed courriers, 0 for an empty collection.
pub(crate) fn completion_rate(closed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let rate = (closed as f64 * 100.0 / total as f64).round();
    rate.clamp(0.0, 100.0) as u8
}
