//! Courrier registration, imputation and status lifecycle.
//!
//! Storage and the service/category/user directories are collaborators behind
//! the traits in [`repository`]; everything else is computed here.

pub mod deadline;
pub mod domain;
pub mod imputation;
pub mod lifecycle;
pub mod reference;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use deadline::{is_late, DeadlinePolicy};
pub use domain::{
    Actor, Canal, Category, CategoryId, Completion, ConfidentialiteEntrant,
    ConfidentialiteSortant, Correspondance, Courrier, CourrierDraft, CourrierError, CourrierId,
    CourrierPatch, CourrierType, Destinataire, Expediteur, Imputation, NewCourrier, Priorite,
    Reference, Service, ServiceId, Statut, User, UserId,
};
pub use imputation::{ImputationPlan, ImputationRequest};
pub use lifecycle::{check_transition, Evidence, TransitionEntry, TransitionJournal};
pub use reference::ReferenceGenerator;
pub use repository::{
    CategoryDirectory, CourrierFilter, CourrierStore, ServiceDirectory, StoreError, UserDirectory,
};
pub use router::{courrier_router, status_for, ACTOR_HEADER};
pub use service::CourrierWorkflow;
