use serde::{Deserialize, Serialize};

use super::domain::{
    Category, CategoryId, Courrier, CourrierId, CourrierPatch, CourrierType, NewCourrier, Service,
    ServiceId, User,
};

/// Storage abstraction for courriers; the backing store owns persistence.
pub trait CourrierStore: Send + Sync {
    fn list(&self, filter: &CourrierFilter) -> Result<Vec<Courrier>, StoreError>;
    fn fetch(&self, id: &CourrierId) -> Result<Option<Courrier>, StoreError>;
    fn create(&self, draft: NewCourrier) -> Result<Courrier, StoreError>;
    fn update(&self, id: &CourrierId, patch: CourrierPatch) -> Result<Courrier, StoreError>;
    fn delete(&self, id: &CourrierId) -> Result<(), StoreError>;
}

pub trait ServiceDirectory: Send + Sync {
    fn services(&self) -> Result<Vec<Service>, StoreError>;
}

pub trait CategoryDirectory: Send + Sync {
    fn categories(&self) -> Result<Vec<Category>, StoreError>;
}

pub trait UserDirectory: Send + Sync {
    fn users(&self) -> Result<Vec<User>, StoreError>;
}

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Query parameters understood by [`CourrierStore::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourrierFilter {
    #[serde(default, rename = "type")]
    pub courrier_type: Option<CourrierType>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub service: Option<ServiceId>,
    #[serde(default)]
    pub category: Option<CategoryId>,
}

impl CourrierFilter {
    pub fn of_type(courrier_type: CourrierType) -> Self {
        Self {
            courrier_type: Some(courrier_type),
            ..Self::default()
        }
    }

    /// Reference implementation of the filter semantics for in-memory stores.
    ///
    /// `search` is a case-insensitive substring match over `objet` and
    /// `reference`; `service` matches the active imputation only.
    pub fn matches(&self, courrier: &Courrier) -> bool {
        if let Some(courrier_type) = self.courrier_type {
            if courrier.courrier_type() != courrier_type {
                return false;
            }
        }

        if let Some(service) = self.service {
            let assigned = courrier
                .active_imputation()
                .map(|imputation| imputation.service);
            if assigned != Some(service) {
                return false;
            }
        }

        if let Some(category) = self.category {
            if courrier.category != Some(category) {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                courrier.objet.to_lowercase().contains(&needle)
                    || courrier.reference.as_str().to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}
