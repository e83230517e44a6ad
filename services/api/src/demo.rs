use crate::infra::{seeded_directory, InMemoryCourrierStore};
use chrono::{DateTime, FixedOffset, Utc};
use clap::Args;
use courrier::config::AppConfig;
use courrier::error::AppError;
use courrier::workflows::courrier::{
    Actor, Canal, Completion, Correspondance, CourrierDraft, CourrierError, CourrierWorkflow,
    DeadlinePolicy, Destinataire, Expediteur, ImputationRequest, Priorite, ServiceId, Statut,
    UserId,
};
use courrier::workflows::dashboard::{
    CollaboratorSnapshot, DashboardReport, ReportingClock, SnapshotSource,
};
use courrier::workflows::import::SnapshotImporter;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DashboardReportArgs {
    /// Courrier CSV export
    #[arg(long)]
    pub(crate) courriers: PathBuf,
    /// Optional user CSV export (needed for author names and user counts)
    #[arg(long)]
    pub(crate) users: Option<PathBuf>,
    /// Optional service CSV export
    #[arg(long)]
    pub(crate) services: Option<PathBuf>,
    /// Evaluation instant (RFC 3339). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_instant)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Reporting UTC offset such as +01:00. Defaults to the configured offset.
    #[arg(long, value_parser = crate::infra::parse_offset)]
    pub(crate) utc_offset: Option<FixedOffset>,
    /// Print the report as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Instant the demo pretends to run at (RFC 3339). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_instant)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Reporting UTC offset such as +01:00. Defaults to the configured offset.
    #[arg(long, value_parser = crate::infra::parse_offset)]
    pub(crate) utc_offset: Option<FixedOffset>,
    /// Print the closing dashboard as JSON instead of text
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_dashboard_report(args: DashboardReportArgs) -> Result<(), AppError> {
    let DashboardReportArgs {
        courriers,
        users,
        services,
        now,
        utc_offset,
        json,
    } = args;

    let offset = resolve_offset(utc_offset)?;
    let imported = SnapshotImporter::from_paths(courriers, users, services)?;
    let clock = ReportingClock::new(now.unwrap_or_else(Utc::now), offset);

    let report = DashboardReport::compute(&imported.snapshot, &clock);
    print_report(&report, json)?;

    if !imported.rejected.is_empty() {
        eprintln!("Skipped {} unreadable row(s):", imported.rejected.len());
        for rejection in &imported.rejected {
            eprintln!("- {rejection}");
        }
    }
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        now,
        utc_offset,
        json,
    } = args;

    let now = now.unwrap_or_else(Utc::now);
    let offset = resolve_offset(utc_offset)?;
    let today = now.with_timezone(&offset).date_naive();

    let store = Arc::new(InMemoryCourrierStore::default());
    let directory = Arc::new(seeded_directory());
    let workflow = CourrierWorkflow::new(
        store.clone(),
        directory.clone(),
        DeadlinePolicy::default(),
    );
    let secretariat = Actor::new(UserId(1));
    let chef_finances = Actor::new(UserId(3));

    println!("Courrier workflow demo ({})", now.to_rfc3339());

    let plainte = workflow.register(
        CourrierDraft {
            objet: "Plainte pour nuisances sonores".to_string(),
            canal: Some(Canal::Physique),
            correspondance: Correspondance::Entrant {
                date_reception: today - chrono::Duration::days(5),
                expediteur: Expediteur {
                    nom: Some("Collectif du quartier Nord".to_string()),
                    ..Expediteur::default()
                },
                confidentialite: Default::default(),
            },
            category: None,
            priorite: Some(Priorite::Urgente),
            service: Some(ServiceId(1)),
            responsable: None,
        },
        &secretariat,
        now,
    )?;
    let facture = workflow.register(
        CourrierDraft {
            objet: "Facture de maintenance".to_string(),
            canal: Some(Canal::Email),
            correspondance: Correspondance::Entrant {
                date_reception: today,
                expediteur: Expediteur {
                    email: Some("factures@prestataire.example".to_string()),
                    ..Expediteur::default()
                },
                confidentialite: Default::default(),
            },
            category: None,
            priorite: None,
            service: Some(ServiceId(2)),
            responsable: None,
        },
        &secretariat,
        now,
    )?;
    let reponse = workflow.register(
        CourrierDraft {
            objet: "Réponse au collectif du quartier Nord".to_string(),
            canal: None,
            correspondance: Correspondance::Sortant {
                date_envoi: today,
                destinataire: Destinataire {
                    nom: Some("Collectif du quartier Nord".to_string()),
                    ..Destinataire::default()
                },
                confidentialite: Default::default(),
            },
            category: None,
            priorite: Some(Priorite::Haute),
            service: None,
            responsable: None,
        },
        &secretariat,
        now,
    )?;

    println!("\nRegistered");
    for courrier in [&plainte, &facture, &reponse] {
        println!(
            "- {} [{}] {} | priorité {:?} | échéance {}",
            courrier.reference,
            courrier.statut,
            courrier.objet,
            courrier.priorite,
            courrier
                .date_echeance
                .map(|date| date.to_string())
                .unwrap_or_else(|| "aucune".to_string())
        );
    }

    let moved = workflow.imputer(
        &plainte.id,
        ImputationRequest {
            service: ServiceId(2),
            responsable: Some(UserId(3)),
            category: None,
        },
        &secretariat,
        now,
    )?;
    println!(
        "\n{} re-imputed to service {} (responsable {})",
        plainte.reference,
        moved.service,
        moved
            .responsable
            .map(|user| user.to_string())
            .unwrap_or_else(|| "-".to_string())
    );

    workflow.imputer(
        &reponse.id,
        ImputationRequest {
            service: ServiceId(1),
            responsable: None,
            category: None,
        },
        &secretariat,
        now,
    )?;
    workflow.transition(&reponse.id, Statut::Traitement, None, &chef_finances, now)?;
    workflow.transition(
        &reponse.id,
        Statut::Repondu,
        Some(Completion::SelfResponse),
        &chef_finances,
        now,
    )?;

    workflow.transition(&plainte.id, Statut::Traitement, None, &chef_finances, now)?;
    workflow.transition(
        &plainte.id,
        Statut::Repondu,
        Some(Completion::LinkedResponse {
            reference: reponse.reference.to_string(),
        }),
        &chef_finances,
        now,
    )?;
    workflow.transition(&plainte.id, Statut::Archive, None, &secretariat, now)?;

    match workflow.transition(
        &facture.id,
        Statut::Repondu,
        Some(Completion::LinkedResponse {
            reference: reponse.reference.to_string(),
        }),
        &chef_finances,
        now,
    ) {
        Ok(_) => println!("\nUnexpected: {} skipped processing", facture.reference),
        Err(err) => println!("\n{} rejected: {}", facture.reference, err),
    }

    println!("\nTransition journal (newest first)");
    for entry in workflow.recent_transitions(10) {
        println!(
            "- courrier {}: {} -> {} by user {}",
            entry.courrier, entry.from, entry.to, entry.actor
        );
    }

    let snapshot = CollaboratorSnapshot::new(store, directory)
        .snapshot()
        .map_err(CourrierError::from)?;
    let report = DashboardReport::compute(&snapshot, &ReportingClock::new(now, offset));
    println!();
    print_report(&report, json)
}

fn resolve_offset(explicit: Option<FixedOffset>) -> Result<FixedOffset, AppError> {
    match explicit {
        Some(offset) => Ok(offset),
        None => Ok(AppConfig::load()?.reporting.utc_offset),
    }
}

fn print_report(report: &DashboardReport, json: bool) -> Result<(), AppError> {
    if json {
        let payload = serde_json::to_string_pretty(report).map_err(std::io::Error::from)?;
        println!("{payload}");
    } else {
        println!("{}", report.render_text());
    }
    Ok(())
}
