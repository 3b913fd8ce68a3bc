pub mod api;
pub mod auth;
pub mod cache;
pub mod cli;
pub mod config;
pub mod db;
pub mod entities;
pub mod models;
pub mod pagination;
pub mod ratelimit;
pub mod services;

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
pub use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use services::BootstrapOutcome;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub async fn run(config: Config) -> anyhow::Result<()> {
    run_with(Cli::parse(), config).await
}

pub async fn run_with(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::CheckConfig => cli::cmd_check_config(&config),

        Commands::Bootstrap => {
            config.validate()?;
            init_tracing(&config);
            cli::cmd_bootstrap(&config).await.map(|_| ())
        }

        Commands::Serve => {
            config.validate()?;
            init_tracing(&config);
            let prometheus_handle = install_metrics(&config)?;
            run_server(config, prometheus_handle).await
        }
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = if config.general.log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if let Err(e) = result {
        eprintln!("Tracing already initialized: {e}");
    }
}

fn install_metrics(config: &Config) -> anyhow::Result<Option<PrometheusHandle>> {
    if !config.observability.metrics_enabled {
        return Ok(None);
    }

    use metrics_exporter_prometheus::PrometheusBuilder;
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    info!("Prometheus metrics recorder initialized");
    Ok(Some(handle))
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.general.environment,
        "Shoreline starting"
    );

    let port = config.server.port;
    let auth_config = config.auth.clone();

    let state = api::create_app_state_from_config(config, prometheus_handle).await?;

    match state.auth_service().bootstrap_admin(&auth_config).await {
        Ok(BootstrapOutcome::Created) => {
            warn!(
                username = %auth_config.admin_username,
                "Created bootstrap admin account; change its password"
            );
        }
        Ok(BootstrapOutcome::AlreadyExists) => {}
        Err(e) => return Err(anyhow::anyhow!("Admin bootstrap failed: {e}")),
    }

    let purge_handle = ratelimit::spawn_purge_task(state.rate_limiter.clone());

    let app = api::router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Listening on http://{}", addr);

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        error!("Server error: {}", e);
    }

    if let Some(handle) = purge_handle {
        handle.abort();
    }
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}
