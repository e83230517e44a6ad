use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::workflows::courrier::{CourrierId, CourrierType, Reference, Statut};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: usize,
    pub active_users: usize,
    pub inactive_users: usize,
    pub total_services: usize,
    pub courriers_today: usize,
    pub courriers_pending: usize,
    pub courriers_late: usize,
    pub completion_rate: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Lateness,
    InactiveUsers,
    UrgentBacklog,
}

impl AlertKind {
    pub const fn ordered() -> [Self; 3] {
        [Self::Lateness, Self::InactiveUsers, Self::UrgentBacklog]
    }

    pub const fn severity(self) -> AlertSeverity {
        match self {
            Self::Lateness | Self::UrgentBacklog => AlertSeverity::Error,
            Self::InactiveUsers => AlertSeverity::Warning,
        }
    }

    pub fn title(self, count: usize) -> String {
        match self {
            Self::Lateness => format!("{count} courrier(s) en retard"),
            Self::InactiveUsers => format!("{count} utilisateur(s) inactif(s)"),
            Self::UrgentBacklog => format!("{count} courrier(s) urgent(s)"),
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Lateness => "Des courriers ont dépassé leur date d'échéance",
            Self::InactiveUsers => "Certains comptes utilisateurs sont désactivés",
            Self::UrgentBacklog => "Des courriers urgents nécessitent une attention immédiate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Error,
    Warning,
}

impl AlertSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub count: usize,
    pub title: String,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: CourrierId,
    pub reference: Reference,
    #[serde(rename = "type")]
    pub courrier_type: CourrierType,
    pub objet: String,
    pub user: String,
    pub created_at: DateTime<Utc>,
    /// Creation date in the reporting timezone.
    pub date: NaiveDate,
    pub statut: Statut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub generated_at: DateTime<Utc>,
    pub stats: DashboardStats,
    pub alerts: Vec<DashboardAlert>,
    pub recent_activity: Vec<ActivityEntry>,
}

impl DashboardReport {
    /// Plain-text rendering used by the CLI.
    pub fn render_text(&self) -> String {
        let stats = &self.stats;
        let mut lines = vec![
            format!("Tableau de bord au {}", self.generated_at.to_rfc3339()),
            format!(
                "Utilisateurs: {} ({} actifs, {} inactifs)",
                stats.total_users, stats.active_users, stats.inactive_users
            ),
            format!("Services: {}", stats.total_services),
            format!("Courriers du jour: {}", stats.courriers_today),
            format!("En attente: {}", stats.courriers_pending),
            format!("En retard: {}", stats.courriers_late),
            format!("Taux de traitement: {}%", stats.completion_rate),
        ];

        if !self.alerts.is_empty() {
            lines.push(String::new());
            lines.push("Alertes:".to_string());
            for alert in &self.alerts {
                lines.push(format!(
                    "  [{}] {} - {}",
                    alert.severity.label(),
                    alert.title,
                    alert.description
                ));
            }
        }

        if !self.recent_activity.is_empty() {
            lines.push(String::new());
            lines.push("Activité récente:".to_string());
            for entry in &self.recent_activity {
                lines.push(format!(
                    "  {} {} [{}] {} par {} ({})",
                    entry.date,
                    entry.reference,
                    entry.statut.label(),
                    entry.objet,
                    entry.user,
                    entry.courrier_type.label()
                ));
            }
        }

        lines.join("\n")
    }
}
