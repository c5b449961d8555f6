use std::{process, sync::Arc};

use marscache::{
    application::{
        error::AppError,
        provider::RoverProvider,
        rovers::RoverService,
    },
    cache::{self, CacheAside, CacheBackend, CacheConfig},
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        nasa::NasaClient,
        telemetry,
    },
};
use tokio::task::JoinHandle;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let app = build_application_context(&settings)?;
    let maintenance = cache::spawn_maintenance(app.cache_backend.clone(), settings.cache.sweep_interval);

    let result = serve_http(&settings, app.http_state).await;

    stop_task(maintenance).await;
    result
}

struct ApplicationContext {
    http_state: HttpState,
    cache_backend: CacheBackend,
}

fn build_application_context(settings: &config::Settings) -> Result<ApplicationContext, AppError> {
    let cache_config = CacheConfig::from(settings);
    let cache_backend = CacheBackend::from_config(&cache_config)?;
    info!(
        backend = cache_backend.kind().as_str(),
        ttl_seconds = cache_config.ttl.as_secs(),
        coalesce_misses = cache_config.coalesce_misses,
        "Cache backend initialised"
    );

    let resolver = Arc::new(CacheAside::new(cache_backend.clone(), &cache_config));
    let provider: Arc<dyn RoverProvider> =
        Arc::new(NasaClient::from_settings(&settings.upstream).map_err(AppError::from)?);
    let rovers = Arc::new(RoverService::new(provider, resolver));

    Ok(ApplicationContext {
        http_state: HttpState::new(rovers, settings.server.request_timeout),
        cache_backend,
    })
}

async fn serve_http(settings: &config::Settings, http_state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(http_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "Listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn stop_task(handle: JoinHandle<()>) {
    handle.abort();
    let _ = handle.await;
}
