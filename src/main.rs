//! Kora SMS server
//!
//! Multi-tenant SMS send core: prepaid credit ledgers, sender identities and
//! a single upstream provider behind an HTTP API.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpResponse, HttpServer};
use kora_api::{configure_routes, AppState, BUSINESS_ID_HEADER};
use kora_core::config::{AppConfig, LoggingConfig};
use kora_db::{
    create_pool, run_migrations, PgLedgerRepository, PgMessageRepository, PgSenderRepository,
    PgTemplateRepository,
};
use kora_provider::ProviderClient;
use kora_services::{LedgerService, SendOrchestrator, SenderValidator};
use std::io;
use std::sync::Arc;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "kora_sms={level},kora_api={level},kora_services={level},kora_provider={level},kora_db={level},kora={level},actix_web=info,sqlx=warn",
            level = logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.json {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    init_tracing(&config.logging);

    info!("Starting Kora SMS v{}", env!("CARGO_PKG_VERSION"));

    info!("Connecting to database...");
    let pool = create_pool(&config.database.url, Some(config.database.max_connections))
        .await
        .map_err(|e| startup_error("Failed to create database pool", e))?;

    if config.database.run_migrations {
        run_migrations(&pool)
            .await
            .map_err(|e| startup_error("Failed to apply migrations", e))?;
    }

    let gateway = ProviderClient::from_config(&config.provider)
        .map_err(|e| startup_error("Failed to build provider client", e))?;
    info!(
        "Provider client configured for {} with {}s timeout",
        config.provider.send_url, config.provider.timeout_secs
    );

    let ledger = Arc::new(LedgerService::new(Arc::new(PgLedgerRepository::new(
        pool.clone(),
        config.messaging.currency.clone(),
    ))));
    let senders = Arc::new(SenderValidator::new(Arc::new(PgSenderRepository::new(
        pool.clone(),
    ))));
    let orchestrator = Arc::new(SendOrchestrator::new(
        ledger.clone(),
        senders.clone(),
        Arc::new(PgMessageRepository::new(pool.clone())),
        Arc::new(PgTemplateRepository::new(pool.clone())),
        Arc::new(gateway),
        config.messaging.country_code.clone(),
    ));
    let state = AppState::new(ledger, senders, orchestrator);

    let cors_origins = config.server.cors_origins.clone().unwrap_or_else(|| {
        "http://localhost:3000,http://127.0.0.1:3000".to_string()
    });

    let bind_addr = config.server_addr();
    let workers = config.server.workers;
    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, workers
    );

    HttpServer::new(move || {
        let cors_origins_inner = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                let origins: Vec<&str> = cors_origins_inner.split(',').collect();
                if let Ok(origin_str) = origin.to_str() {
                    origins.iter().any(|o| o.trim() == origin_str)
                } else {
                    false
                }
            })
            .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .allowed_header(BUSINESS_ID_HEADER)
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                let error_message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest().json(serde_json::json!({
                        "error": "invalid_body",
                        "message": error_message,
                        "status": 400,
                    })),
                )
                .into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                let error_message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest().json(serde_json::json!({
                        "error": "invalid_query",
                        "message": error_message,
                        "status": 400,
                    })),
                )
                .into()
            }))
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure_routes)
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await
}
