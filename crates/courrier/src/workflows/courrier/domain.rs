use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::repository::StoreError;

/// Store-assigned identifier; ordering is used to break ties in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourrierId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub u64);

impl fmt::Display for CourrierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human readable reference such as `ENT-2025-00042`; immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reference(pub String);

impl Reference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity on whose behalf a lifecycle or imputation operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user: UserId,
}

impl Actor {
    pub const fn new(user: UserId) -> Self {
        Self { user }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourrierType {
    Entrant,
    Sortant,
}

impl CourrierType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Entrant => "entrant",
            Self::Sortant => "sortant",
        }
    }

    pub(crate) const fn reference_prefix(self) -> &'static str {
        match self {
            Self::Entrant => "ENT",
            Self::Sortant => "SOR",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "entrant" => Some(Self::Entrant),
            "sortant" => Some(Self::Sortant),
            _ => None,
        }
    }
}

/// Workflow state. The only legal path is `recu -> impute -> traitement -> repondu -> archive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statut {
    Recu,
    Impute,
    Traitement,
    Repondu,
    Archive,
}

impl Statut {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Recu,
            Self::Impute,
            Self::Traitement,
            Self::Repondu,
            Self::Archive,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Recu => "recu",
            Self::Impute => "impute",
            Self::Traitement => "traitement",
            Self::Repondu => "repondu",
            Self::Archive => "archive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|statut| statut.label().eq_ignore_ascii_case(value.trim()))
    }

    /// The single state reachable from `self`, if any.
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::Recu => Some(Self::Impute),
            Self::Impute => Some(Self::Traitement),
            Self::Traitement => Some(Self::Repondu),
            Self::Repondu => Some(Self::Archive),
            Self::Archive => None,
        }
    }

    /// Work still expected: `recu`, `impute` or `traitement`.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Recu | Self::Impute | Self::Traitement)
    }

    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Repondu | Self::Archive)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Archive)
    }
}

impl fmt::Display for Statut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priorite {
    Urgente,
    Haute,
    #[default]
    Normale,
    Basse,
}

impl Priorite {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Urgente => "urgente",
            Self::Haute => "haute",
            Self::Normale => "normale",
            Self::Basse => "basse",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [Self::Urgente, Self::Haute, Self::Normale, Self::Basse]
            .into_iter()
            .find(|priorite| priorite.label().eq_ignore_ascii_case(value.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Canal {
    Physique,
    Email,
    Portail,
    Telephone,
    Autre,
}

impl Canal {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "physique" => Some(Self::Physique),
            "email" => Some(Self::Email),
            "portail" => Some(Self::Portail),
            "telephone" => Some(Self::Telephone),
            "autre" => Some(Self::Autre),
            _ => None,
        }
    }
}

/// Confidentiality levels recorded on incoming mail (masculine forms).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidentialiteEntrant {
    #[default]
    Normal,
    Restreint,
    Confidentiel,
}

/// Confidentiality levels recorded on outgoing mail (feminine forms).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidentialiteSortant {
    #[default]
    Normale,
    Restreinte,
    Confidentielle,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expediteur {
    #[serde(default)]
    pub nom: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destinataire {
    #[serde(default)]
    pub nom: Option<String>,
    #[serde(default)]
    pub adresse: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Direction-specific data: parties, the date that starts the response clock,
/// and the confidentiality vocabulary of that direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Correspondance {
    Entrant {
        date_reception: NaiveDate,
        #[serde(default)]
        expediteur: Expediteur,
        #[serde(default)]
        confidentialite: ConfidentialiteEntrant,
    },
    Sortant {
        date_envoi: NaiveDate,
        #[serde(default)]
        destinataire: Destinataire,
        #[serde(default)]
        confidentialite: ConfidentialiteSortant,
    },
}

impl Correspondance {
    pub const fn courrier_type(&self) -> CourrierType {
        match self {
            Self::Entrant { .. } => CourrierType::Entrant,
            Self::Sortant { .. } => CourrierType::Sortant,
        }
    }

    /// `date_reception` for incoming mail, `date_envoi` for outgoing mail.
    pub const fn start_date(&self) -> NaiveDate {
        match self {
            Self::Entrant { date_reception, .. } => *date_reception,
            Self::Sortant { date_envoi, .. } => *date_envoi,
        }
    }
}

/// Assignment of a courrier to a service. Superseded entries keep their
/// `ended_at` timestamp and stay in the courrier's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Imputation {
    pub service: ServiceId,
    #[serde(default)]
    pub responsable: Option<UserId>,
    pub imputed_at: DateTime<Utc>,
    pub imputed_by: UserId,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Imputation {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Courrier {
    pub id: CourrierId,
    pub reference: Reference,
    pub objet: String,
    #[serde(default)]
    pub canal: Option<Canal>,
    #[serde(flatten)]
    pub correspondance: Correspondance,
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub priorite: Priorite,
    pub statut: Statut,
    #[serde(default)]
    pub date_echeance: Option<NaiveDate>,
    #[serde(default)]
    pub imputations: Vec<Imputation>,
    #[serde(default)]
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Courrier {
    pub const fn courrier_type(&self) -> CourrierType {
        self.correspondance.courrier_type()
    }

    pub const fn start_date(&self) -> NaiveDate {
        self.correspondance.start_date()
    }

    pub fn active_imputation(&self) -> Option<&Imputation> {
        self.imputations.iter().rev().find(|entry| entry.is_active())
    }

    pub fn superseded_imputations(&self) -> impl Iterator<Item = &Imputation> {
        self.imputations.iter().filter(|entry| !entry.is_active())
    }
}

/// Registration input. The reference, status and due date are derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourrierDraft {
    pub objet: String,
    #[serde(default)]
    pub canal: Option<Canal>,
    #[serde(flatten)]
    pub correspondance: Correspondance,
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub priorite: Option<Priorite>,
    #[serde(default)]
    pub service: Option<ServiceId>,
    #[serde(default)]
    pub responsable: Option<UserId>,
}

/// Fully derived record handed to the store, which assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCourrier {
    pub reference: Reference,
    pub objet: String,
    pub canal: Option<Canal>,
    pub correspondance: Correspondance,
    pub category: Option<CategoryId>,
    pub priorite: Priorite,
    pub statut: Statut,
    pub date_echeance: Option<NaiveDate>,
    pub imputations: Vec<Imputation>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl NewCourrier {
    pub fn into_courrier(self, id: CourrierId) -> Courrier {
        Courrier {
            id,
            reference: self.reference,
            objet: self.objet,
            canal: self.canal,
            correspondance: self.correspondance,
            category: self.category,
            priorite: self.priorite,
            statut: self.statut,
            date_echeance: self.date_echeance,
            imputations: self.imputations,
            created_by: self.created_by,
            created_at: self.created_at,
        }
    }
}

/// Partial update applied by the store in a single write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourrierPatch {
    pub statut: Option<Statut>,
    pub priorite: Option<Priorite>,
    pub date_echeance: Option<Option<NaiveDate>>,
    pub category: Option<Option<CategoryId>>,
    pub imputations: Option<Vec<Imputation>>,
}

impl CourrierPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(self, courrier: &mut Courrier) {
        if let Some(statut) = self.statut {
            courrier.statut = statut;
        }
        if let Some(priorite) = self.priorite {
            courrier.priorite = priorite;
        }
        if let Some(date_echeance) = self.date_echeance {
            courrier.date_echeance = date_echeance;
        }
        if let Some(category) = self.category {
            courrier.category = category;
        }
        if let Some(imputations) = self.imputations {
            courrier.imputations = imputations;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub nom: String,
    #[serde(default)]
    pub chef: Option<UserId>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub nom: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub prenom: String,
    pub nom: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.prenom, self.nom)
    }
}

fn active_by_default() -> bool {
    true
}

/// Proof that a courrier in `traitement` has been answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Completion {
    /// An outgoing courrier is itself the response.
    SelfResponse,
    /// An incoming courrier is answered by a separately registered response.
    LinkedResponse { reference: String },
}

/// Errors raised by lifecycle, imputation and registration operations.
#[derive(Debug, thiserror::Error)]
pub enum CourrierError {
    #[error("transition {from} -> {to} is not allowed")]
    InvalidTransition { from: Statut, to: Statut },
    #[error("courrier is archived and accepts no further changes")]
    TerminalStateViolation,
    #[error("service {0} does not exist or is inactive")]
    ServiceNotFound(ServiceId),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("courrier {0} not found")]
    NotFound(CourrierId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CourrierError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Transport failures may succeed when the whole operation is retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Unavailable(_)))
    }
}
