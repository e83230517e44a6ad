use crate::workflows::courrier::{Priorite, Statut};

use super::views::{AlertKind, DashboardAlert, DashboardStats};
use super::DashboardSnapshot;

/// Alerts in fixed order; an alert is only raised when its count is non-zero.
pub(crate) fn compute_alerts(
    snapshot: &DashboardSnapshot,
    stats: &DashboardStats,
) -> Vec<DashboardAlert> {
    // Urgent backlog counts archived courriers too: only `repondu` clears it.
    let urgent = snapshot
        .courriers
        .iter()
        .filter(|courrier| {
            courrier.priorite == Priorite::Urgente && courrier.statut != Statut::Repondu
        })
        .count();

    AlertKind::ordered()
        .into_iter()
        .filter_map(|kind| {
            let count = match kind {
                AlertKind::Lateness => stats.courriers_late,
                AlertKind::InactiveUsers => stats.inactive_users,
                AlertKind::UrgentBacklog => urgent,
            };
            (count > 0).then(|| DashboardAlert {
                kind,
                severity: kind.severity(),
                count,
                title: kind.title(count),
                description: kind.description(),
            })
        })
        .collect()
}
