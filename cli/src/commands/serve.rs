//! `jobmesh serve` — run the Dispatcher API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use jobmesh_core::config::Config;
use jobmesh_core::dispatch::api::{AppState, CorsConfig, DispatcherServer, RateLimiterConfig};
use jobmesh_core::dispatch::{
    FilesystemBlobStore, MemoryRegistry, Scheduler, SchedulerConfig as RuntimeSchedulerConfig,
    WorkerTokenService,
};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the configured bind address (host:port)
    #[arg(long)]
    pub bind: Option<String>,
}

pub async fn execute(args: ServeArgs, config: Config, verbose: bool) -> Result<()> {
    let bind_address = args.bind.unwrap_or(config.dispatcher.bind_address.clone());
    let addr: SocketAddr = bind_address
        .parse()
        .with_context(|| format!("invalid bind address: {bind_address}"))?;

    std::fs::create_dir_all(&config.dispatcher.blob_store_root)
        .context("failed to create blob store root")?;

    let registry = Arc::new(MemoryRegistry::new());
    let scheduler = Arc::new(Scheduler::new(
        registry.clone(),
        RuntimeSchedulerConfig {
            heartbeat_timeout: chrono::Duration::milliseconds(
                config.scheduler.heartbeat_timeout_ms,
            ),
            cooldown: chrono::Duration::milliseconds(config.scheduler.cooldown_ms),
            max_cpu_usage_pct: config.scheduler.max_cpu_usage_pct,
        },
    ));
    let blob_store = Arc::new(FilesystemBlobStore::new(
        config.dispatcher.blob_store_root.clone(),
    ));
    let token_service = Arc::new(
        WorkerTokenService::new(config.security.worker_token_secret.clone())
            .with_ttl_hours(config.security.worker_token_ttl_hours),
    );

    let state = Arc::new(AppState::new(
        registry,
        scheduler,
        blob_store,
        token_service,
        RateLimiterConfig {
            window: Duration::from_millis(config.dispatcher.rate_limit_window_ms),
            max_requests: config.dispatcher.rate_limit_max,
        },
    ));

    let cors = CorsConfig {
        allowed_origins: config.dispatcher.allowed_origins.clone(),
    };
    let server = DispatcherServer::new(state, cors);
    let router = server
        .router()
        .into_make_service_with_connect_info::<SocketAddr>();

    println!("{}", "jobmesh dispatcher".bold().cyan());
    println!("  listening on {}", addr.to_string().green());
    if verbose {
        println!("  blob store root: {}", config.dispatcher.blob_store_root.display());
        println!(
            "  rate limit: {} req / {}ms",
            config.dispatcher.rate_limit_max, config.dispatcher.rate_limit_window_ms
        );
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, router)
        .await
        .context("dispatcher server exited")?;

    Ok(())
}
