use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Completion, CourrierError, CourrierId, CourrierType, ServiceId, Statut, UserId};

/// What the caller brings along to justify a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    None,
    /// A service assignment produced by the imputation resolver.
    Imputation(ServiceId),
    /// The caller attests the courrier has been answered.
    Completion(Completion),
}

/// Validates a single move of the `statut` field.
///
/// Archived courriers reject everything with `TerminalStateViolation`; any
/// edge other than the immediate successor is an `InvalidTransition`.
pub fn check_transition(
    courrier_type: CourrierType,
    from: Statut,
    to: Statut,
    evidence: &Evidence,
) -> Result<(), CourrierError> {
    if from.is_terminal() {
        return Err(CourrierError::TerminalStateViolation);
    }

    if from.successor() != Some(to) {
        return Err(CourrierError::InvalidTransition { from, to });
    }

    match (to, evidence) {
        (Statut::Impute, Evidence::Imputation(_)) => Ok(()),
        (Statut::Impute, _) => Err(CourrierError::InvalidTransition { from, to }),
        (Statut::Repondu, Evidence::Completion(completion)) => {
            check_completion(courrier_type, completion)
        }
        (Statut::Repondu, _) => Err(CourrierError::validation(
            "a completion attestation is required to mark a courrier as answered",
        )),
        _ => Ok(()),
    }
}

fn check_completion(
    courrier_type: CourrierType,
    completion: &Completion,
) -> Result<(), CourrierError> {
    match (courrier_type, completion) {
        (CourrierType::Sortant, Completion::SelfResponse) => Ok(()),
        (CourrierType::Entrant, Completion::LinkedResponse { reference }) => {
            if reference.trim().is_empty() {
                Err(CourrierError::validation(
                    "the linked response reference must not be blank",
                ))
            } else {
                Ok(())
            }
        }
        (CourrierType::Sortant, Completion::LinkedResponse { .. }) => Err(
            CourrierError::validation("an outgoing courrier is its own response"),
        ),
        (CourrierType::Entrant, Completion::SelfResponse) => Err(CourrierError::validation(
            "an incoming courrier must reference its response",
        )),
    }
}

/// Immutable record of an accepted transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionEntry {
    pub courrier: CourrierId,
    pub from: Statut,
    pub to: Statut,
    pub at: DateTime<Utc>,
    pub actor: UserId,
}

/// Append-only log of accepted transitions, keyed by courrier.
///
/// Callers serialize writes per courrier; reads may run concurrently.
#[derive(Debug, Default)]
pub struct TransitionJournal {
    entries: RwLock<HashMap<CourrierId, Vec<TransitionEntry>>>,
}

impl TransitionJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&self, entry: TransitionEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.entry(entry.courrier).or_default().push(entry);
    }

    /// Transitions of one courrier in the order they were accepted.
    pub fn history(&self, courrier: &CourrierId) -> Vec<TransitionEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(courrier).cloned().unwrap_or_default()
    }

    /// Most recent transitions across all courriers, newest first.
    pub fn recent(&self, limit: usize) -> Vec<TransitionEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        // Reversed per courrier so the stable sort keeps same-instant entries newest first.
        let mut all: Vec<TransitionEntry> = entries
            .values()
            .flat_map(|history| history.iter().rev())
            .cloned()
            .collect();
        all.sort_by(|a, b| b.at.cmp(&a.at).then_with(|| b.courrier.cmp(&a.courrier)));
        all.truncate(limit);
        all
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
