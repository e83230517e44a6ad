use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Courrier, Priorite};

/// Response delay granted per priority, counted in calendar days from the
/// reception (incoming) or send (outgoing) date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlinePolicy {
    pub urgente_days: u32,
    pub haute_days: u32,
    pub normale_days: u32,
    pub basse_days: u32,
}

impl Default for DeadlinePolicy {
    fn default() -> Self {
        Self {
            urgente_days: 2,
            haute_days: 5,
            normale_days: 10,
            basse_days: 20,
        }
    }
}

impl DeadlinePolicy {
    pub const fn days_for(&self, priorite: Priorite) -> u32 {
        match priorite {
            Priorite::Urgente => self.urgente_days,
            Priorite::Haute => self.haute_days,
            Priorite::Normale => self.normale_days,
            Priorite::Basse => self.basse_days,
        }
    }

    pub fn due_date(&self, start: NaiveDate, priorite: Priorite) -> NaiveDate {
        start
            .checked_add_days(Days::new(u64::from(self.days_for(priorite))))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Due date of `courrier` under `priorite`, always counted from its
    /// original start date rather than from the moment of recomputation.
    pub fn echeance_for(&self, courrier: &Courrier, priorite: Priorite) -> NaiveDate {
        self.due_date(courrier.start_date(), priorite)
    }
}

/// A courrier is late when it is still open and `now` has passed the start of
/// its due day, read in the reporting `offset`. Courriers without a due date
/// are never late.
pub fn is_late(courrier: &Courrier, now: DateTime<Utc>, offset: FixedOffset) -> bool {
    match courrier.date_echeance {
        Some(echeance) => {
            courrier.statut.is_open()
                && now.with_timezone(&offset).naive_local() > echeance.and_time(NaiveTime::MIN)
        }
        None => false,
    }
}
