use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::courrier::domain::{
    Actor, Canal, Category, CategoryId, ConfidentialiteEntrant, ConfidentialiteSortant,
    Correspondance, Courrier, CourrierDraft, CourrierId, CourrierPatch, CourrierType,
    Destinataire, Expediteur, Imputation, NewCourrier, Priorite, Reference, Service, ServiceId,
    Statut, UserId,
};
use crate::workflows::courrier::repository::{
    CategoryDirectory, CourrierFilter, CourrierStore, ServiceDirectory, StoreError,
};
use crate::workflows::courrier::{courrier_router, CourrierWorkflow, DeadlinePolicy};

pub(super) const DIRECTION: ServiceId = ServiceId(1);
pub(super) const FINANCES: ServiceId = ServiceId(2);
pub(super) const ARCHIVES: ServiceId = ServiceId(3);
pub(super) const FACTURES: CategoryId = CategoryId(7);

pub(super) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub(super) fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn now() -> DateTime<Utc> {
    at(2025, 3, 10, 9)
}

pub(super) fn secretariat() -> Actor {
    Actor::new(UserId(11))
}

pub(super) fn chef() -> Actor {
    Actor::new(UserId(12))
}

pub(super) fn services() -> Vec<Service> {
    vec![
        Service {
            id: DIRECTION,
            nom: "Direction".to_string(),
            chef: Some(UserId(12)),
            is_active: true,
        },
        Service {
            id: FINANCES,
            nom: "Finances".to_string(),
            chef: None,
            is_active: true,
        },
        Service {
            id: ARCHIVES,
            nom: "Archives".to_string(),
            chef: None,
            is_active: false,
        },
    ]
}

pub(super) fn categories() -> Vec<Category> {
    vec![Category {
        id: FACTURES,
        nom: "Factures".to_string(),
    }]
}

pub(super) fn entrant_draft(service: Option<ServiceId>) -> CourrierDraft {
    CourrierDraft {
        objet: "Demande de subvention".to_string(),
        canal: Some(Canal::Physique),
        correspondance: Correspondance::Entrant {
            date_reception: date(2025, 3, 3),
            expediteur: Expediteur {
                nom: Some("Association des riverains".to_string()),
                email: None,
                telephone: None,
            },
            confidentialite: ConfidentialiteEntrant::Normal,
        },
        category: None,
        priorite: None,
        service,
        responsable: None,
    }
}

pub(super) fn sortant_draft() -> CourrierDraft {
    CourrierDraft {
        objet: "Convocation au conseil".to_string(),
        canal: Some(Canal::Email),
        correspondance: Correspondance::Sortant {
            date_envoi: date(2025, 3, 5),
            destinataire: Destinataire {
                nom: Some("Conseil municipal".to_string()),
                adresse: None,
                email: Some("conseil@example.org".to_string()),
            },
            confidentialite: ConfidentialiteSortant::Restreinte,
        },
        category: None,
        priorite: Some(Priorite::Haute),
        service: None,
        responsable: None,
    }
}

/// A stored courrier built directly, bypassing registration.
pub(super) fn stored_courrier(id: u64, statut: Statut, imputations: Vec<Imputation>) -> Courrier {
    Courrier {
        id: CourrierId(id),
        reference: Reference(format!("ENT-2025-{id:05}")),
        objet: "Recours gracieux".to_string(),
        canal: None,
        correspondance: Correspondance::Entrant {
            date_reception: date(2025, 3, 1),
            expediteur: Expediteur::default(),
            confidentialite: ConfidentialiteEntrant::default(),
        },
        category: None,
        priorite: Priorite::Normale,
        statut,
        date_echeance: Some(date(2025, 3, 11)),
        imputations,
        created_by: Some(UserId(11)),
        created_at: at(2025, 3, 1, 8),
    }
}

pub(super) fn active_imputation(service: ServiceId) -> Imputation {
    Imputation {
        service,
        responsable: None,
        imputed_at: at(2025, 3, 1, 10),
        imputed_by: UserId(11),
        ended_at: None,
    }
}

#[derive(Default)]
pub(super) struct MemoryStore {
    records: Mutex<BTreeMap<CourrierId, Courrier>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub(super) fn with(courriers: Vec<Courrier>) -> Self {
        let next = courriers.iter().map(|c| c.id.0).max().unwrap_or(0);
        Self {
            records: Mutex::new(courriers.into_iter().map(|c| (c.id, c)).collect()),
            next_id: AtomicU64::new(next),
        }
    }

    pub(super) fn get(&self, id: u64) -> Courrier {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .get(&CourrierId(id))
            .cloned()
            .expect("courrier stored")
    }
}

impl CourrierStore for MemoryStore {
    fn list(&self, filter: &CourrierFilter) -> Result<Vec<Courrier>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .filter(|courrier| filter.matches(courrier))
            .cloned()
            .collect())
    }

    fn fetch(&self, id: &CourrierId) -> Result<Option<Courrier>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn create(&self, draft: NewCourrier) -> Result<Courrier, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.values().any(|c| c.reference == draft.reference) {
            return Err(StoreError::Conflict);
        }
        let id = CourrierId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let courrier = draft.into_courrier(id);
        guard.insert(id, courrier.clone());
        Ok(courrier)
    }

    fn update(&self, id: &CourrierId, patch: CourrierPatch) -> Result<Courrier, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let courrier = guard.get_mut(id).ok_or(StoreError::NotFound)?;
        patch.apply_to(courrier);
        Ok(courrier.clone())
    }

    fn delete(&self, id: &CourrierId) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

pub(super) struct MemoryDirectory {
    pub(super) services: Vec<Service>,
    pub(super) categories: Vec<Category>,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self {
            services: services(),
            categories: categories(),
        }
    }
}

impl ServiceDirectory for MemoryDirectory {
    fn services(&self) -> Result<Vec<Service>, StoreError> {
        Ok(self.services.clone())
    }
}

impl CategoryDirectory for MemoryDirectory {
    fn categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.categories.clone())
    }
}

pub(super) struct UnavailableStore;

impl CourrierStore for UnavailableStore {
    fn list(&self, _filter: &CourrierFilter) -> Result<Vec<Courrier>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &CourrierId) -> Result<Option<Courrier>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn create(&self, _draft: NewCourrier) -> Result<Courrier, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _id: &CourrierId, _patch: CourrierPatch) -> Result<Courrier, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &CourrierId) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) type MemoryWorkflow = CourrierWorkflow<MemoryStore, MemoryDirectory>;

pub(super) fn build_workflow() -> (MemoryWorkflow, Arc<MemoryStore>) {
    build_workflow_with(Vec::new())
}

pub(super) fn build_workflow_with(courriers: Vec<Courrier>) -> (MemoryWorkflow, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::with(courriers));
    let workflow = CourrierWorkflow::new(
        store.clone(),
        Arc::new(MemoryDirectory::default()),
        DeadlinePolicy::default(),
    );
    (workflow, store)
}

pub(super) fn router_with(workflow: MemoryWorkflow) -> axum::Router {
    courrier_router(Arc::new(workflow))
}

pub(super) fn reference_of(courrier: &Courrier) -> (CourrierType, i32, u32) {
    crate::workflows::courrier::reference::parse(courrier.reference.as_str())
        .expect("well formed reference")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
