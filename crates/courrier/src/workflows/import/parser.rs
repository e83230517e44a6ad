use std::io::Read;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};

use crate::workflows::courrier::{
    Canal, CategoryId, ConfidentialiteEntrant, ConfidentialiteSortant, Correspondance, Courrier,
    CourrierId, CourrierType, Destinataire, Expediteur, Priorite, Reference, Service, ServiceId,
    Statut, User, UserId,
};

use tracing::warn;

use super::{ImportError, Imported, RowRejection};

/// Deserialize every row, converting each with `convert`.
///
/// Rows that fail to deserialize or convert are skipped and reported in
/// `rejected`; only an unreadable source or header aborts the import. `line`
/// is the 1-based line of the file, the header being line 1.
pub(crate) fn parse_rows<R, Row, T>(
    export: &'static str,
    reader: R,
    convert: impl Fn(Row) -> Result<T, String>,
) -> Result<Imported<T>, ImportError>
where
    R: Read,
    Row: DeserializeOwned,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader.headers()?;

    let mut imported = Imported::default();
    for (index, row) in csv_reader.deserialize::<Row>().enumerate() {
        let line = index as u64 + 2;
        let converted = match row {
            Ok(row) => convert(row),
            Err(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => return Err(err.into()),
            Err(err) => Err(err.to_string()),
        };

        match converted {
            Ok(record) => imported.records.push(record),
            Err(message) => {
                warn!(export, line, reason = %message, "skipping unreadable row");
                imported.rejected.push(RowRejection {
                    export,
                    line,
                    message,
                });
            }
        }
    }

    Ok(imported)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CourrierRow {
    id: u64,
    reference: String,
    #[serde(rename = "type")]
    courrier_type: String,
    #[serde(default)]
    objet: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    canal: Option<String>,
    statut: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    priorite: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    confidentialite: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    date_reception: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    date_envoi: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    date_echeance: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    category: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    expediteur_nom: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    expediteur_email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    expediteur_telephone: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    destinataire_nom: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    destinataire_adresse: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    destinataire_email: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    created_by: Option<String>,
    created_at: String,
}

impl CourrierRow {
    pub(crate) fn into_courrier(self) -> Result<Courrier, String> {
        let courrier_type = CourrierType::parse(&self.courrier_type)
            .ok_or_else(|| format!("unknown type `{}`", self.courrier_type))?;
        let statut =
            Statut::parse(&self.statut).ok_or_else(|| format!("unknown statut `{}`", self.statut))?;
        let priorite = match self.priorite.as_deref() {
            Some(raw) => Priorite::parse(raw).ok_or_else(|| format!("unknown priorite `{raw}`"))?,
            None => Priorite::default(),
        };
        let canal = match self.canal.as_deref() {
            Some(raw) => Some(Canal::parse(raw).ok_or_else(|| format!("unknown canal `{raw}`"))?),
            None => None,
        };
        let confidentialite = self.confidentialite.as_deref().map(str::to_ascii_lowercase);
        let created_at = parse_instant("created_at", &self.created_at)?;

        // Without its start date a courrier keeps no due date, so it never counts as late.
        let start = match courrier_type {
            CourrierType::Entrant => {
                optional_date("date_reception", self.date_reception.as_deref())?
            }
            CourrierType::Sortant => optional_date("date_envoi", self.date_envoi.as_deref())?,
        };
        let date_echeance = match start {
            Some(_) => optional_date("date_echeance", self.date_echeance.as_deref())?,
            None => None,
        };
        let start = start.unwrap_or_else(|| created_at.date_naive());

        let correspondance = match courrier_type {
            CourrierType::Entrant => Correspondance::Entrant {
                date_reception: start,
                expediteur: Expediteur {
                    nom: self.expediteur_nom,
                    email: self.expediteur_email,
                    telephone: self.expediteur_telephone,
                },
                confidentialite: match confidentialite.as_deref() {
                    None | Some("normal") => ConfidentialiteEntrant::Normal,
                    Some("restreint") => ConfidentialiteEntrant::Restreint,
                    Some("confidentiel") => ConfidentialiteEntrant::Confidentiel,
                    Some(other) => return Err(format!("unknown confidentialite `{other}`")),
                },
            },
            CourrierType::Sortant => Correspondance::Sortant {
                date_envoi: start,
                destinataire: Destinataire {
                    nom: self.destinataire_nom,
                    adresse: self.destinataire_adresse,
                    email: self.destinataire_email,
                },
                confidentialite: match confidentialite.as_deref() {
                    None | Some("normale") => ConfidentialiteSortant::Normale,
                    Some("restreinte") => ConfidentialiteSortant::Restreinte,
                    Some("confidentielle") => ConfidentialiteSortant::Confidentielle,
                    Some(other) => return Err(format!("unknown confidentialite `{other}`")),
                },
            },
        };

        Ok(Courrier {
            id: CourrierId(self.id),
            reference: Reference(self.reference),
            objet: self.objet,
            canal,
            correspondance,
            category: optional_id("category", self.category.as_deref())?.map(CategoryId),
            priorite,
            statut,
            date_echeance,
            imputations: Vec::new(),
            created_by: optional_id("created_by", self.created_by.as_deref())?.map(UserId),
            created_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserRow {
    id: u64,
    #[serde(default)]
    prenom: String,
    #[serde(default)]
    nom: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    role: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    is_active: Option<String>,
    date_joined: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    last_login: Option<String>,
}

impl UserRow {
    pub(crate) fn into_user(self) -> Result<User, String> {
        Ok(User {
            id: UserId(self.id),
            prenom: self.prenom,
            nom: self.nom,
            email: self.email,
            role: self.role,
            is_active: parse_flag("is_active", self.is_active.as_deref())?,
            date_joined: parse_instant("date_joined", &self.date_joined)?,
            last_login: self
                .last_login
                .as_deref()
                .map(|raw| parse_instant("last_login", raw))
                .transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServiceRow {
    id: u64,
    nom: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    chef: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    is_active: Option<String>,
}

impl ServiceRow {
    pub(crate) fn into_service(self) -> Result<Service, String> {
        Ok(Service {
            id: ServiceId(self.id),
            nom: self.nom,
            chef: optional_id("chef", self.chef.as_deref())?.map(UserId),
            is_active: parse_flag("is_active", self.is_active.as_deref())?,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn optional_date(column: &str, value: Option<&str>) -> Result<Option<NaiveDate>, String> {
    value
        .map(|raw| parse_date(raw).ok_or_else(|| format!("{column}: invalid date `{raw}`")))
        .transpose()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(trimmed).ok().map(|dt| dt.date_naive()))
}

/// RFC 3339 instants; a bare date is read as midnight UTC.
pub(crate) fn parse_instant(column: &str, value: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("{column}: invalid timestamp `{trimmed}`"))
}

fn optional_id(column: &str, value: Option<&str>) -> Result<Option<u64>, String> {
    value
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|_| format!("{column}: invalid id `{raw}`"))
        })
        .transpose()
}

/// Missing flags default to active.
fn parse_flag(column: &str, value: Option<&str>) -> Result<bool, String> {
    match value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
        None | Some("true") | Some("1") | Some("oui") | Some("yes") => Ok(true),
        Some("false") | Some("0") | Some("non") | Some("no") => Ok(false),
        Some(other) => Err(format!("{column}: invalid flag `{other}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instants_accept_rfc3339_and_bare_dates() {
        let rfc = parse_instant("created_at", "2025-03-10T09:30:00+01:00").expect("rfc3339");
        assert_eq!(rfc.to_rfc3339(), "2025-03-10T08:30:00+00:00");

        let bare = parse_instant("created_at", "2025-03-10").expect("date");
        assert_eq!(bare.to_rfc3339(), "2025-03-10T00:00:00+00:00");

        assert!(parse_instant("created_at", "yesterday").is_err());
    }

    #[test]
    fn flags_default_to_active() {
        assert_eq!(parse_flag("is_active", None), Ok(true));
        assert_eq!(parse_flag("is_active", Some("Non")), Ok(false));
        assert_eq!(parse_flag("is_active", Some("0")), Ok(false));
        assert!(parse_flag("is_active", Some("peut-être")).is_err());
    }
}
