use std::cmp::Reverse;
use std::collections::HashMap;

use crate::workflows::courrier::{Courrier, UserId};

use super::views::ActivityEntry;
use super::{DashboardSnapshot, ReportingClock};

pub const ACTIVITY_WINDOW: usize = 10;
pub const ACTIVITY_DISPLAYED: usize = 5;
pub const UNKNOWN_AUTHOR: &str = "Inconnu";

/// Most recent courriers by creation instant, ties broken by id, newest first.
pub(crate) fn recent_activity(
    snapshot: &DashboardSnapshot,
    clock: &ReportingClock,
) -> Vec<ActivityEntry> {
    let authors: HashMap<UserId, String> = snapshot
        .users
        .iter()
        .map(|user| (user.id, user.display_name()))
        .collect();

    let mut courriers: Vec<&Courrier> = snapshot.courriers.iter().collect();
    courriers.sort_by_key(|courrier| Reverse((courrier.created_at, courrier.id)));

    courriers
        .into_iter()
        .take(ACTIVITY_WINDOW)
        .map(|courrier| ActivityEntry {
            id: courrier.id,
            reference: courrier.reference.clone(),
            courrier_type: courrier.courrier_type(),
            objet: courrier.objet.clone(),
            user: courrier
                .created_by
                .and_then(|author| authors.get(&author).cloned())
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            created_at: courrier.created_at,
            date: clock.local_date(courrier.created_at),
            statut: courrier.statut,
        })
        .take(ACTIVITY_DISPLAYED)
        .collect()
}
