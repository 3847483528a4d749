use crate::cli::ServeArgs;
use crate::infra::{open_store, AppState, TracingNotifier};
use crate::routes::with_registration_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use employee_intake::config::AppConfig;
use employee_intake::error::AppError;
use employee_intake::telemetry;
use employee_intake::workflows::registration::{
    DirectoryRegistrationClient, FileSystemBlobStore, HtmlReportRenderer,
    NotificationOrchestrator, NotificationQueue, NotificationServices, ProfileService,
    RegistrationPipeline, ScriptEngine, ValidationOrchestrator,
};
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

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let db = open_store(&config)?;
    let blobs = Arc::new(FileSystemBlobStore::new(config.storage.report_dir.clone()));
    let engine = Arc::new(ScriptEngine::new(db.clone(), config.scripting));

    let notifications = Arc::new(NotificationOrchestrator::new(
        db.clone(),
        db.clone(),
        engine.clone(),
        NotificationServices {
            renderer: Arc::new(HtmlReportRenderer::default()),
            blobs: blobs.clone(),
            directory: db.clone(),
            notifier: Arc::new(TracingNotifier),
        },
    ));
    let (queue, _worker) = NotificationQueue::spawn(notifications);

    let pipeline = Arc::new(RegistrationPipeline::new(
        ValidationOrchestrator::new(db.clone(), engine),
        Arc::new(DirectoryRegistrationClient::new(db.clone())),
        Arc::new(queue),
    ));
    let profiles = Arc::new(ProfileService::new(db.clone(), db, blobs));

    let app = with_registration_routes(pipeline, profiles)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        database = %config.storage.database_path.display(),
        "employee intake service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
