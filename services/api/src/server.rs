use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use carelink::config::AppConfig;
use carelink::error::AppError;
use carelink::integrations::{
    ChannelJobQueue, CrmSync, LocalBlobStore, RegistrationJobHandler, ZohoClient,
};
use carelink::marketplace::{InMemoryMarketplace, MarketplaceError, MarketplaceService, SessionStore};
use carelink::telemetry;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let repository = Arc::new(InMemoryMarketplace::new());
    let blobs = Arc::new(
        LocalBlobStore::new(
            config.storage.upload_dir.clone(),
            &config.storage.public_base_url,
        )
        .map_err(MarketplaceError::from)?,
    );
    let crm: Option<Arc<dyn CrmSync>> = match config.crm.clone() {
        Some(crm_config) => Some(Arc::new(ZohoClient::new(crm_config)?)),
        None => {
            warn!("Zoho credentials not configured; CRM sync disabled");
            None
        }
    };
    let handler = Arc::new(RegistrationJobHandler::new(repository.clone(), crm));
    let (jobs, _job_worker) = ChannelJobQueue::start(config.jobs.queue_capacity, handler);

    let service = Arc::new(MarketplaceService::new(
        repository,
        blobs.clone(),
        Arc::new(jobs),
        SessionStore::new(config.sessions.ttl),
    ));
    if let Some(seed) = &config.admin {
        service.bootstrap_admin(&seed.email, &seed.password)?;
    }
    spawn_expiry_sweep(service.clone(), config.jobs.expiry_sweep);

    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        blobs,
    };
    let app = with_operational_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "carelink marketplace ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn spawn_expiry_sweep(service: Arc<MarketplaceService>, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match service.expire_documents(Utc::now()) {
                Ok(0) => {}
                Ok(expired) => info!(expired, "expired lapsed verification documents"),
                Err(err) => error!(error = %err, "document expiry sweep failed"),
            }
        }
    });
}
