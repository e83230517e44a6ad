use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Datelike, Utc};
use tracing::{info, warn};

use super::deadline::DeadlinePolicy;
use super::domain::{
    Actor, Completion, Courrier, CourrierDraft, CourrierError, CourrierId, CourrierPatch,
    CourrierType, Imputation, NewCourrier, Priorite, Statut,
};
use super::imputation::{
    initial_imputation, plan_imputation, resolve_category, resolve_service, ImputationRequest,
};
use super::lifecycle::{check_transition, Evidence, TransitionEntry, TransitionJournal};
use super::reference::ReferenceGenerator;
use super::repository::{
    CategoryDirectory, CourrierFilter, CourrierStore, ServiceDirectory, StoreError,
};

/// Service composing the store, directories, reference generator, deadline
/// policy and transition journal behind the courrier operations.
///
/// Mutations of one courrier are serialized; different courriers proceed in
/// parallel.
pub struct CourrierWorkflow<S, D> {
    store: Arc<S>,
    directory: Arc<D>,
    references: Arc<ReferenceGenerator>,
    deadlines: DeadlinePolicy,
    journal: Arc<TransitionJournal>,
    locks: CourrierLocks,
}

/// Per-courrier mutexes, created on demand and dropped once no caller holds
/// or waits on them.
#[derive(Default)]
struct CourrierLocks {
    slots: Mutex<HashMap<CourrierId, Arc<Mutex<()>>>>,
}

impl CourrierLocks {
    fn lease(&self, id: CourrierId) -> SlotLease<'_> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        SlotLease {
            locks: self,
            id,
            slot: Arc::clone(slots.entry(id).or_default()),
        }
    }

    fn tracked(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

struct SlotLease<'a> {
    locks: &'a CourrierLocks,
    id: CourrierId,
    slot: Arc<Mutex<()>>,
}

impl SlotLease<'_> {
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SlotLease<'_> {
    fn drop(&mut self) {
        let mut slots = self.locks.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Clones are only handed out under the registry lock, so two owners
        // here means the registry and this lease.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.id);
        }
    }
}

impl<S, D> CourrierWorkflow<S, D>
where
    S: CourrierStore + 'static,
    D: ServiceDirectory + CategoryDirectory + 'static,
{
    pub fn new(store: Arc<S>, directory: Arc<D>, deadlines: DeadlinePolicy) -> Self {
        Self::with_references(store, directory, deadlines, ReferenceGenerator::new())
    }

    pub fn with_references(
        store: Arc<S>,
        directory: Arc<D>,
        deadlines: DeadlinePolicy,
        references: ReferenceGenerator,
    ) -> Self {
        Self {
            store,
            directory,
            references: Arc::new(references),
            deadlines,
            journal: Arc::new(TransitionJournal::new()),
            locks: CourrierLocks::default(),
        }
    }

    /// Build a workflow whose reference numbering resumes after every
    /// reference already present in the store.
    pub fn resume(
        store: Arc<S>,
        directory: Arc<D>,
        deadlines: DeadlinePolicy,
    ) -> Result<Self, CourrierError> {
        let existing = store.list(&CourrierFilter::default())?;
        let references =
            ReferenceGenerator::seeded(existing.iter().map(|courrier| &courrier.reference));
        Ok(Self::with_references(store, directory, deadlines, references))
    }

    pub fn deadlines(&self) -> DeadlinePolicy {
        self.deadlines
    }

    pub fn journal(&self) -> Arc<TransitionJournal> {
        Arc::clone(&self.journal)
    }

    /// Register a new courrier.
    ///
    /// Incoming courriers must name a service. When a service is given the
    /// courrier is created already imputed, in the same store write.
    pub fn register(
        &self,
        draft: CourrierDraft,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Courrier, CourrierError> {
        let courrier_type = draft.correspondance.courrier_type();
        let objet = draft.objet.trim().to_string();
        if objet.is_empty() {
            return Err(CourrierError::validation("objet is required"));
        }
        if courrier_type == CourrierType::Entrant && draft.service.is_none() {
            return Err(CourrierError::validation(
                "a service is required when registering an incoming courrier",
            ));
        }
        if draft.responsable.is_some() && draft.service.is_none() {
            return Err(CourrierError::validation(
                "a responsable can only be named together with a service",
            ));
        }

        if let Some(category) = draft.category {
            let categories = self.directory.categories()?;
            resolve_category(&categories, category)?;
        }

        let mut statut = Statut::Recu;
        let mut imputations: Vec<Imputation> = Vec::new();
        if let Some(service_id) = draft.service {
            let services = self.directory.services()?;
            let service = resolve_service(&services, service_id)?;
            check_transition(
                courrier_type,
                Statut::Recu,
                Statut::Impute,
                &Evidence::Imputation(service.id),
            )?;
            imputations.push(initial_imputation(service, draft.responsable, actor, now));
            statut = Statut::Impute;
        }

        let priorite = draft.priorite.unwrap_or_default();
        let date_echeance = self
            .deadlines
            .due_date(draft.correspondance.start_date(), priorite);
        let reference = self.references.next(courrier_type, now.year());

        let created = self.store.create(NewCourrier {
            reference,
            objet,
            canal: draft.canal,
            correspondance: draft.correspondance,
            category: draft.category,
            priorite,
            statut,
            date_echeance: Some(date_echeance),
            imputations,
            created_by: Some(actor.user),
            created_at: now,
        })?;

        if created.statut == Statut::Impute {
            self.journal.append(TransitionEntry {
                courrier: created.id,
                from: Statut::Recu,
                to: Statut::Impute,
                at: now,
                actor: actor.user,
            });
        }

        info!(
            courrier = %created.id,
            reference = %created.reference,
            courrier_type = courrier_type.label(),
            actor = %actor.user,
            "courrier registered"
        );

        Ok(created)
    }

    /// Assign or reassign a courrier to a service and return the active imputation.
    pub fn imputer(
        &self,
        id: &CourrierId,
        request: ImputationRequest,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Imputation, CourrierError> {
        let lease = self.locks.lease(*id);
        let _serialized = lease.lock();

        let courrier = self.fetch_existing(id)?;
        let services = self.directory.services()?;
        let categories = match request.category {
            Some(_) => self.directory.categories()?,
            None => Vec::new(),
        };

        let plan = plan_imputation(&courrier, &request, &services, &categories, actor, now)
            .inspect_err(|err| {
                warn!(
                    courrier = %id,
                    service = %request.service,
                    error = %err,
                    "imputation rejected"
                );
            })?;

        if !plan.changed {
            return Ok(plan.active);
        }

        let patch = CourrierPatch {
            statut: plan.transition.map(|(_, to)| to),
            date_echeance: Some(Some(
                self.deadlines.echeance_for(&courrier, courrier.priorite),
            )),
            category: (plan.category != courrier.category).then_some(plan.category),
            imputations: Some(plan.imputations),
            ..CourrierPatch::default()
        };
        self.store.update(id, patch)?;

        if let Some((from, to)) = plan.transition {
            self.journal.append(TransitionEntry {
                courrier: *id,
                from,
                to,
                at: now,
                actor: actor.user,
            });
        }

        info!(
            courrier = %id,
            service = %plan.active.service,
            actor = %actor.user,
            "courrier imputed"
        );

        Ok(plan.active)
    }

    /// Move a courrier to `to`. Moving to `impute` must go through [`Self::imputer`].
    pub fn transition(
        &self,
        id: &CourrierId,
        to: Statut,
        completion: Option<Completion>,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Courrier, CourrierError> {
        let lease = self.locks.lease(*id);
        let _serialized = lease.lock();

        let courrier = self.fetch_existing(id)?;
        let from = courrier.statut;
        let evidence = completion.map_or(Evidence::None, Evidence::Completion);

        check_transition(courrier.courrier_type(), from, to, &evidence).inspect_err(|err| {
            warn!(courrier = %id, %from, %to, error = %err, "transition rejected");
        })?;

        let updated = self.store.update(
            id,
            CourrierPatch {
                statut: Some(to),
                ..CourrierPatch::default()
            },
        )?;

        self.journal.append(TransitionEntry {
            courrier: *id,
            from,
            to,
            at: now,
            actor: actor.user,
        });

        info!(courrier = %id, %from, %to, actor = %actor.user, "courrier transitioned");

        Ok(updated)
    }

    /// Change the priority and recompute the due date from the original
    /// reception/send date.
    pub fn change_priorite(
        &self,
        id: &CourrierId,
        priorite: Priorite,
        actor: &Actor,
    ) -> Result<Courrier, CourrierError> {
        let lease = self.locks.lease(*id);
        let _serialized = lease.lock();

        let courrier = self.fetch_existing(id)?;
        if courrier.statut.is_terminal() {
            return Err(CourrierError::TerminalStateViolation);
        }
        if courrier.priorite == priorite && courrier.date_echeance.is_some() {
            return Ok(courrier);
        }

        let date_echeance = self.deadlines.echeance_for(&courrier, priorite);
        let updated = self.store.update(
            id,
            CourrierPatch {
                priorite: Some(priorite),
                date_echeance: Some(Some(date_echeance)),
                ..CourrierPatch::default()
            },
        )?;

        info!(
            courrier = %id,
            priorite = priorite.label(),
            %date_echeance,
            actor = %actor.user,
            "courrier priority changed"
        );

        Ok(updated)
    }

    pub fn get(&self, id: &CourrierId) -> Result<Courrier, CourrierError> {
        self.fetch_existing(id)
    }

    pub fn list(&self, filter: &CourrierFilter) -> Result<Vec<Courrier>, CourrierError> {
        Ok(self.store.list(filter)?)
    }

    /// Number of courriers with a live mutation lock.
    pub fn pending_locks(&self) -> usize {
        self.locks.tracked()
    }

    pub fn history(&self, id: &CourrierId) -> Vec<TransitionEntry> {
        self.journal.history(id)
    }

    pub fn recent_transitions(&self, limit: usize) -> Vec<TransitionEntry> {
        self.journal.recent(limit)
    }

    fn fetch_existing(&self, id: &CourrierId) -> Result<Courrier, CourrierError> {
        match self.store.fetch(id) {
            Ok(Some(courrier)) => Ok(courrier),
            Ok(None) | Err(StoreError::NotFound) => Err(CourrierError::NotFound(*id)),
            Err(other) => Err(other.into()),
        }
    }
}
