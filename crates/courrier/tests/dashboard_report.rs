use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use courrier::workflows::courrier::{
    Correspondance, Courrier, CourrierId, Expediteur, Priorite, Reference, Service, ServiceId,
    Statut, User, UserId,
};
use courrier::workflows::dashboard::{
    AlertKind, AlertSeverity, DashboardReport, DashboardSnapshot, ReportingClock, UNKNOWN_AUTHOR,
};
use courrier::workflows::import::SnapshotImporter;
use std::io::Cursor;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn instant(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("valid instant")
        .with_timezone(&Utc)
}

fn march(d: u32) -> NaiveDate {
    date(2025, 3, d)
}

fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, d, h, m, 0)
        .single()
        .expect("valid instant")
}

fn clock() -> ReportingClock {
    ReportingClock::new(
        instant("2025-03-10T12:00:00Z"),
        FixedOffset::east_opt(3600).expect("valid offset"),
    )
}

fn courrier(
    id: u64,
    statut: Statut,
    priorite: Priorite,
    echeance: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    created_by: Option<u64>,
) -> Courrier {
    Courrier {
        id: CourrierId(id),
        reference: Reference(format!("ENT-2025-{id:05}")),
        objet: format!("Courrier {id}"),
        canal: None,
        correspondance: Correspondance::Entrant {
            date_reception: created_at.date_naive(),
            expediteur: Expediteur::default(),
            confidentialite: Default::default(),
        },
        category: None,
        priorite,
        statut,
        date_echeance: echeance,
        imputations: Vec::new(),
        created_by: created_by.map(UserId),
        created_at,
    }
}

fn user(id: u64, prenom: &str, nom: &str, is_active: bool) -> User {
    User {
        id: UserId(id),
        prenom: prenom.to_string(),
        nom: nom.to_string(),
        email: format!("{}@example.org", prenom.to_lowercase()),
        role: "agent".to_string(),
        is_active,
        date_joined: instant("2024-01-01T00:00:00Z"),
        last_login: None,
    }
}

/// Ten courriers: three closed, seven open, two of the open ones past due.
fn scenario() -> DashboardSnapshot {
    let courriers = vec![
        courrier(1, Statut::Repondu, Priorite::Normale, Some(march(1)), at(1, 8, 0), Some(1)),
        courrier(2, Statut::Archive, Priorite::Urgente, Some(march(4)), at(2, 8, 0), Some(2)),
        courrier(3, Statut::Repondu, Priorite::Urgente, Some(march(5)), at(3, 8, 0), Some(1)),
        courrier(4, Statut::Traitement, Priorite::Haute, Some(march(5)), at(4, 8, 0), Some(2)),
        courrier(5, Statut::Impute, Priorite::Normale, Some(march(9)), at(5, 8, 0), Some(1)),
        courrier(6, Statut::Recu, Priorite::Normale, Some(march(11)), at(6, 8, 0), Some(3)),
        courrier(7, Statut::Traitement, Priorite::Urgente, Some(march(12)), at(7, 8, 0), Some(1)),
        courrier(8, Statut::Impute, Priorite::Basse, Some(march(28)), at(9, 22, 30), Some(99)),
        courrier(9, Statut::Recu, Priorite::Normale, None, at(9, 23, 30), None),
        courrier(10, Statut::Recu, Priorite::Haute, Some(march(15)), at(10, 11, 0), Some(2)),
    ];

    DashboardSnapshot {
        courriers,
        users: vec![
            user(1, "Awa", "Diallo", true),
            user(2, "Jean", "Martin", true),
            user(3, "Fatou", "Sow", false),
        ],
        services: vec![Service {
            id: ServiceId(1),
            nom: "Direction".to_string(),
            chef: Some(UserId(2)),
            is_active: true,
        }],
    }
}

#[test]
fn ten_courrier_scenario_matches_expected_stats() {
    let report = DashboardReport::compute(&scenario(), &clock());
    let stats = &report.stats;

    assert_eq!(stats.completion_rate, 30);
    assert_eq!(stats.courriers_pending, 7);
    assert_eq!(stats.courriers_late, 2);
    assert_eq!(stats.courriers_today, 2);
    assert_eq!(stats.total_users, 3);
    assert_eq!(stats.active_users, 2);
    assert_eq!(stats.inactive_users, 1);
    assert_eq!(stats.total_services, 1);
    assert_eq!(report.generated_at, clock().now);
}

#[test]
fn ten_courrier_scenario_raises_alerts_in_order() {
    let report = DashboardReport::compute(&scenario(), &clock());

    let kinds: Vec<AlertKind> = report.alerts.iter().map(|alert| alert.kind).collect();
    assert_eq!(
        kinds,
        vec![
            AlertKind::Lateness,
            AlertKind::InactiveUsers,
            AlertKind::UrgentBacklog
        ]
    );

    let lateness = &report.alerts[0];
    assert_eq!(lateness.count, 2);
    assert_eq!(lateness.severity, AlertSeverity::Error);
    assert_eq!(lateness.title, "2 courrier(s) en retard");
    assert_eq!(
        lateness.description,
        "Des courriers ont dépassé leur date d'échéance"
    );

    let inactive = &report.alerts[1];
    assert_eq!(inactive.severity, AlertSeverity::Warning);
    assert_eq!(inactive.title, "1 utilisateur(s) inactif(s)");

    // The archived urgent courrier still counts; the answered one does not.
    let urgent = &report.alerts[2];
    assert_eq!(urgent.count, 2);
    assert_eq!(urgent.title, "2 courrier(s) urgent(s)");
}

#[test]
fn recent_activity_is_newest_first_and_truncated() {
    let report = DashboardReport::compute(&scenario(), &clock());
    let activity = &report.recent_activity;

    assert_eq!(activity.len(), 5);
    let ids: Vec<u64> = activity.iter().map(|entry| entry.id.0).collect();
    assert_eq!(ids, vec![10, 9, 8, 7, 6]);

    assert_eq!(activity[0].user, "Jean Martin");
    assert_eq!(activity[1].user, UNKNOWN_AUTHOR);
    assert_eq!(activity[2].user, UNKNOWN_AUTHOR);
    assert_eq!(activity[4].user, "Fatou Sow");
    assert_eq!(activity[1].date, date(2025, 3, 10));
    assert_eq!(activity[2].date, date(2025, 3, 9));
}

#[test]
fn recent_activity_orders_by_instant_then_id() {
    let t = instant("2025-03-01T08:00:00Z");
    let second = chrono::Duration::seconds(1);
    let snapshot = DashboardSnapshot {
        courriers: vec![
            courrier(1, Statut::Recu, Priorite::Normale, None, t, None),
            courrier(2, Statut::Recu, Priorite::Normale, None, t + second, None),
            courrier(3, Statut::Recu, Priorite::Normale, None, t + second * 2, None),
            courrier(4, Statut::Recu, Priorite::Normale, None, t, None),
        ],
        ..DashboardSnapshot::default()
    };

    let report = DashboardReport::compute(&snapshot, &clock());
    let ids: Vec<u64> = report.recent_activity.iter().map(|entry| entry.id.0).collect();
    assert_eq!(ids, vec![3, 2, 4, 1]);
}

#[test]
fn empty_snapshot_has_zero_counts() {
    let report = DashboardReport::compute(&DashboardSnapshot::default(), &clock());
    let payload = serde_json::to_value(&report.stats).expect("stats serialize");

    for field in [
        "totalUsers",
        "activeUsers",
        "inactiveUsers",
        "totalServices",
        "courriersToday",
        "courriersPending",
        "courriersLate",
        "completionRate",
    ] {
        assert_eq!(payload[field], 0, "{field} should be zero");
    }
    assert!(report.alerts.is_empty());
}

#[test]
fn open_courriers_are_late_during_their_due_day() {
    let snapshot = DashboardSnapshot {
        courriers: vec![courrier(
            1,
            Statut::Traitement,
            Priorite::Urgente,
            Some(date(2025, 1, 3)),
            instant("2025-01-01T08:00:00Z"),
            None,
        )],
        ..DashboardSnapshot::default()
    };
    let utc = FixedOffset::east_opt(0).expect("utc");

    let midday = ReportingClock::new(instant("2025-01-03T12:00:00Z"), utc);
    let report = DashboardReport::compute(&snapshot, &midday);
    assert_eq!(report.stats.courriers_late, 1);
    assert_eq!(report.alerts[0].kind, AlertKind::Lateness);

    let eve = ReportingClock::new(instant("2025-01-02T23:59:00Z"), utc);
    assert_eq!(DashboardReport::compute(&snapshot, &eve).stats.courriers_late, 0);
}

#[test]
fn archived_courriers_are_never_late() {
    let past_due = Some(date(2025, 2, 1));
    let created = instant("2025-01-20T08:00:00Z");
    let snapshot = DashboardSnapshot {
        courriers: vec![
            courrier(1, Statut::Traitement, Priorite::Normale, past_due, created, None),
            courrier(2, Statut::Archive, Priorite::Normale, past_due, created, None),
        ],
        ..DashboardSnapshot::default()
    };

    let report = DashboardReport::compute(&snapshot, &clock());
    assert_eq!(report.stats.courriers_late, 1);
    assert_eq!(report.stats.completion_rate, 50);
}

#[test]
fn text_rendering_lists_alerts_and_activity() {
    let report = DashboardReport::compute(&scenario(), &clock());
    let text = report.render_text();

    assert!(text.contains("Taux de traitement: 30%"));
    assert!(text.contains("[error] 2 courrier(s) en retard"));
    assert!(text.contains("ENT-2025-00010"));
}

#[test]
fn readable_export_rows_reach_the_report() {
    let csv = "\
id,reference,type,objet,statut,priorite,date_reception,date_echeance,created_by,created_at
1,ENT-2025-00001,entrant,Réclamation,traitement,urgente,2025-03-01,2025-03-03,1,2025-03-01T08:00:00Z
2,ENT-2025-00002,entrant,Sans date,recu,,,2025-03-05,2,2025-03-10T09:00:00Z
3,ENT-2025-00003,entrant,Statut inconnu,egare,,2025-03-02,,1,2025-03-02T08:00:00Z
";
    let imported = SnapshotImporter::courriers(Cursor::new(csv)).expect("export readable");
    assert_eq!(imported.rejected.len(), 1);
    assert_eq!(imported.rejected[0].line, 4);

    let snapshot = DashboardSnapshot {
        courriers: imported.records,
        users: vec![user(1, "Awa", "Diallo", true), user(2, "Jean", "Martin", true)],
        ..DashboardSnapshot::default()
    };
    let report = DashboardReport::compute(&snapshot, &clock());

    assert_eq!(report.stats.courriers_pending, 2);
    assert_eq!(report.stats.courriers_late, 1);
    assert_eq!(report.stats.courriers_today, 1);
    assert_eq!(report.recent_activity[0].user, "Jean Martin");
}
