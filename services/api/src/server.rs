use crate::cli::ServeArgs;
use crate::infra::{seeded_directory, AppState, InMemoryCourrierStore};
use crate::routes::with_courrier_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use courrier::config::AppConfig;
use courrier::error::AppError;
use courrier::telemetry;
use courrier::workflows::courrier::CourrierWorkflow;
use courrier::workflows::dashboard::{CollaboratorSnapshot, DashboardPoller};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let store = Arc::new(InMemoryCourrierStore::default());
    let directory = Arc::new(seeded_directory());
    let workflow = Arc::new(CourrierWorkflow::resume(
        store.clone(),
        directory.clone(),
        config.deadlines,
    )?);

    let dashboard = Arc::new(DashboardPoller::spawn(
        Arc::new(CollaboratorSnapshot::new(store.clone(), directory)),
        config.reporting.utc_offset,
        config.reporting.poll_interval,
    ));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        dashboard,
        store,
    };

    let app = with_courrier_routes(workflow)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        utc_offset = %config.reporting.utc_offset,
        poll_interval_secs = config.reporting.poll_interval.as_secs(),
        "courrier registry ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
