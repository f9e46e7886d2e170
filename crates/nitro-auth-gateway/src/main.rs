use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{
    middleware::{Condition, Logger},
    web, App, HttpServer,
};
use nitro_auth::NitroRpcClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nitro_auth_gateway::{
    config::GatewayConfig, cors::build_cors, metrics::register_metrics, routes, state::AppState,
};

/// Request bodies larger than this are rejected before parsing.
const MAX_BODY_BYTES: usize = 1024 * 1024;

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(format!("{context}: {e}"))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config =
        GatewayConfig::from_env().map_err(|e| startup_error("failed to load configuration", e))?;
    let listen_addr = config.listen_addr.clone();
    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();
    let rate_limit_rpm = config.rate_limit_rpm;
    let access_log = config.access_log;
    let keep_alive = config.keep_alive;
    let request_timeout = config.request_timeout;
    let backlog = config.backlog;

    tracing::info!("Starting nitro-auth on {}:{}", listen_addr, port);
    tracing::info!("Nitro node: {}", config.nitro_rpc_url);
    tracing::info!("Upstream: {}", config.upstream_url);
    tracing::info!(
        "Allowed methods: {}",
        config.allowed_methods.iter().collect::<Vec<_>>().join(",")
    );

    register_metrics();

    let nitro = NitroRpcClient::new(
        config.nitro_rpc_url.clone(),
        config.nitro_auth_token.clone(),
        config.verifier_timeout,
    )
    .map_err(|e| startup_error("failed to build Nitro client", e))?;

    let state = AppState::new(config, nitro)
        .map_err(|e| startup_error("failed to initialize state", e))?;
    let state_data = web::Data::new(state);

    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm as u64)
        .finish()
        .ok_or_else(|| startup_error("failed to create rate limiter config", "invalid quota"))?;

    HttpServer::new(move || {
        App::new()
            .app_data(state_data.clone())
            .app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
            .wrap(Condition::new(access_log, Logger::default()))
            .wrap(build_cors(&allowed_origins))
            .wrap(Governor::new(&governor_conf))
            .configure(routes::configure::<NitroRpcClient>)
    })
    .keep_alive(keep_alive)
    .client_request_timeout(request_timeout)
    .backlog(backlog)
    .bind((listen_addr.as_str(), port))?
    .run()
    .await
}
