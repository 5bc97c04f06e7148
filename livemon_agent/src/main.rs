//! livemon_agent binary: parse settings, start the tick loop, serve HTTP/WS.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use livemon_agent::aggregator::{spawn_aggregator, Aggregator};
use livemon_agent::config::{AgentConfig, ConfigError, USAGE};
use livemon_agent::registry::SessionRegistry;
use livemon_agent::sampler::SysinfoSource;
use livemon_agent::state::AppState;
use livemon_agent::{router, tls};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = match AgentConfig::parse(env::args(), |k| env::var(k).ok()) {
        Ok(c) => c,
        Err(ConfigError::Help) => {
            println!("{USAGE}");
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let registry = SessionRegistry::new();
    let aggregator = spawn_aggregator(
        registry.clone(),
        Arc::new(SysinfoSource::new()),
        cfg.interval,
    );
    let app = router(AppState::new(registry.clone()));
    let addr = SocketAddr::new(cfg.bind, cfg.port);

    if cfg.enable_tls {
        let (cert, key) = tls::ensure_self_signed_cert()?;
        let rustls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key).await?;
        let handle = axum_server::Handle::new();
        tokio::spawn({
            let handle = handle.clone();
            async move {
                shutdown(aggregator, registry).await;
                handle.graceful_shutdown(Some(Duration::from_secs(5)));
            }
        });
        info!("livemon_agent listening on https://{addr} (wss://{addr}/ws)");
        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        info!("livemon_agent listening on http://{local} (ws://{local}/ws)");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown(aggregator, registry))
            .await?;
    }
    Ok(())
}

/// Wait for Ctrl-C, then stop ticking before tearing down the sessions.
async fn shutdown(aggregator: Aggregator, registry: SessionRegistry) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
    aggregator.shutdown().await;
    let closed = registry.close_all().await;
    info!("closed {closed} session(s)");
}
