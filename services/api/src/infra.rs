use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use courrier::config::parse_utc_offset;
use courrier::workflows::courrier::{
    Category, CategoryDirectory, CategoryId, Courrier, CourrierFilter, CourrierId, CourrierPatch,
    CourrierStore, NewCourrier, Service, ServiceDirectory, ServiceId, StoreError, User,
    UserDirectory, UserId,
};
use courrier::workflows::dashboard::DashboardPoller;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) dashboard: Arc<DashboardPoller>,
    pub(crate) store: Arc<InMemoryCourrierStore>,
}

#[derive(Default)]
struct StoreState {
    records: BTreeMap<CourrierId, Courrier>,
    last_id: u64,
}

/// Process-local courrier store; ids are assigned sequentially.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCourrierStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryCourrierStore {
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("courrier store lock poisoned".to_string()))
    }
}

impl CourrierStore for InMemoryCourrierStore {
    fn list(&self, filter: &CourrierFilter) -> Result<Vec<Courrier>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .records
            .values()
            .filter(|courrier| filter.matches(courrier))
            .cloned()
            .collect())
    }

    fn fetch(&self, id: &CourrierId) -> Result<Option<Courrier>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.records.get(id).cloned())
    }

    fn create(&self, draft: NewCourrier) -> Result<Courrier, StoreError> {
        let mut guard = self.lock()?;
        if guard
            .records
            .values()
            .any(|existing| existing.reference == draft.reference)
        {
            return Err(StoreError::Conflict);
        }

        guard.last_id += 1;
        let id = CourrierId(guard.last_id);
        let courrier = draft.into_courrier(id);
        guard.records.insert(id, courrier.clone());
        Ok(courrier)
    }

    fn update(&self, id: &CourrierId, patch: CourrierPatch) -> Result<Courrier, StoreError> {
        let mut guard = self.lock()?;
        let courrier = guard.records.get_mut(id).ok_or(StoreError::NotFound)?;
        patch.apply_to(courrier);
        Ok(courrier.clone())
    }

    fn delete(&self, id: &CourrierId) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        guard
            .records
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

/// Read-only services, categories and users.
#[derive(Debug, Clone, Default)]
pub(crate) struct InMemoryDirectory {
    pub(crate) services: Vec<Service>,
    pub(crate) categories: Vec<Category>,
    pub(crate) users: Vec<User>,
}

impl ServiceDirectory for InMemoryDirectory {
    fn services(&self) -> Result<Vec<Service>, StoreError> {
        Ok(self.services.clone())
    }
}

impl CategoryDirectory for InMemoryDirectory {
    fn categories(&self) -> Result<Vec<Category>, StoreError> {
        Ok(self.categories.clone())
    }
}

impl UserDirectory for InMemoryDirectory {
    fn users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.clone())
    }
}

/// Reference data the service boots with until a real directory is wired in.
pub(crate) fn seeded_directory() -> InMemoryDirectory {
    let joined = Utc
        .with_ymd_and_hms(2024, 9, 2, 8, 0, 0)
        .single()
        .unwrap_or_default();

    let user = |id: u64, prenom: &str, nom: &str, role: &str, is_active: bool| User {
        id: UserId(id),
        prenom: prenom.to_string(),
        nom: nom.to_string(),
        email: format!(
            "{}.{}@mairie.example",
            prenom.to_lowercase(),
            nom.to_lowercase()
        ),
        role: role.to_string(),
        is_active,
        date_joined: joined,
        last_login: None,
    };

    InMemoryDirectory {
        services: vec![
            Service {
                id: ServiceId(1),
                nom: "Secrétariat général".to_string(),
                chef: Some(UserId(2)),
                is_active: true,
            },
            Service {
                id: ServiceId(2),
                nom: "Finances".to_string(),
                chef: Some(UserId(3)),
                is_active: true,
            },
            Service {
                id: ServiceId(3),
                nom: "Urbanisme".to_string(),
                chef: None,
                is_active: true,
            },
        ],
        categories: vec![
            Category {
                id: CategoryId(1),
                nom: "Demande administrative".to_string(),
            },
            Category {
                id: CategoryId(2),
                nom: "Facture".to_string(),
            },
        ],
        users: vec![
            user(1, "Awa", "Diallo", "secretariat", true),
            user(2, "Jean", "Martin", "chef_service", true),
            user(3, "Mariam", "Traore", "chef_service", true),
            user(4, "Paul", "Lefebvre", "agent", false),
        ],
    }
}

pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}

pub(crate) fn parse_offset(raw: &str) -> Result<FixedOffset, String> {
    parse_utc_offset(raw).ok_or_else(|| format!("'{raw}' is not a UTC offset such as +01:00"))
}
