use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Actor, Category, CategoryId, Courrier, CourrierError, Imputation, Service, ServiceId, Statut,
    UserId,
};
use super::lifecycle::{check_transition, Evidence};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImputationRequest {
    pub service: ServiceId,
    #[serde(default)]
    pub responsable: Option<UserId>,
    #[serde(default)]
    pub category: Option<CategoryId>,
}

/// Outcome computed before anything is written: the full imputation list to
/// store, the new active entry and the status move it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImputationPlan {
    pub imputations: Vec<Imputation>,
    pub active: Imputation,
    pub transition: Option<(Statut, Statut)>,
    pub category: Option<CategoryId>,
    pub changed: bool,
}

/// Look up an imputation target; inactive services are treated as missing.
pub fn resolve_service(services: &[Service], id: ServiceId) -> Result<&Service, CourrierError> {
    services
        .iter()
        .find(|service| service.id == id && service.is_active)
        .ok_or(CourrierError::ServiceNotFound(id))
}

pub fn resolve_category(
    categories: &[Category],
    id: CategoryId,
) -> Result<&Category, CourrierError> {
    categories
        .iter()
        .find(|category| category.id == id)
        .ok_or_else(|| CourrierError::validation(format!("category {id} does not exist")))
}

/// Plan the (re)assignment of `courrier` to the requested service.
///
/// The previous active imputation is end-stamped, never removed. A courrier
/// still in `recu` moves to `impute` together with the assignment.
/// Re-imputing to the same service and responsable changes nothing.
pub fn plan_imputation(
    courrier: &Courrier,
    request: &ImputationRequest,
    services: &[Service],
    categories: &[Category],
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<ImputationPlan, CourrierError> {
    if courrier.statut.is_terminal() {
        return Err(CourrierError::TerminalStateViolation);
    }

    let service = resolve_service(services, request.service)?;
    if let Some(category) = request.category {
        resolve_category(categories, category)?;
    }

    if let Some(current) = courrier.active_imputation() {
        let same_target =
            current.service == service.id && current.responsable == request.responsable;
        let same_category = request.category.is_none() || request.category == courrier.category;
        if same_target && same_category {
            return Ok(ImputationPlan {
                imputations: courrier.imputations.clone(),
                active: current.clone(),
                transition: None,
                category: courrier.category,
                changed: false,
            });
        }
    }

    let transition = if courrier.statut == Statut::Recu {
        check_transition(
            courrier.courrier_type(),
            Statut::Recu,
            Statut::Impute,
            &Evidence::Imputation(service.id),
        )?;
        Some((Statut::Recu, Statut::Impute))
    } else {
        None
    };

    let active = Imputation {
        service: service.id,
        responsable: request.responsable,
        imputed_at: now,
        imputed_by: actor.user,
        ended_at: None,
    };

    let mut imputations = courrier.imputations.clone();
    for previous in imputations.iter_mut().filter(|entry| entry.is_active()) {
        previous.ended_at = Some(now);
    }
    imputations.push(active.clone());

    Ok(ImputationPlan {
        imputations,
        active,
        transition,
        category: request.category.or(courrier.category),
        changed: true,
    })
}

/// Initial assignment made while registering a new courrier.
pub(crate) fn initial_imputation(
    service: &Service,
    responsable: Option<UserId>,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Imputation {
    Imputation {
        service: service.id,
        responsable,
        imputed_at: now,
        imputed_by: actor.user,
        ended_at: None,
    }
}
