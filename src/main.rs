use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use rs_wallet_scanner::{
    api::{ApiState, router},
    cli::{Cli, Commands},
    config::AppConfig,
    notify::MessageBoard,
    scan::{ScanContext, ScanOrchestrator},
    sources::wallet::WalletApiClient,
    utils::{
        logger::init_logger,
        metrics::{NoopScanMetrics, PrometheusScanMetrics, ScanMetrics},
    },
};
use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let cfg = AppConfig::load(&args.config)?;

    // Initialize logger system
    init_logger(&cfg.logging);

    info!("✅ Configuration load successful");
    info!(base_url = %cfg.wallet_api.base_url, "Wallet API endpoint");
    info!(chain_id = %cfg.wallet_api.chain_id, "Chain filter");
    info!(
        page_size = cfg.scan.page_size,
        timeout_secs = cfg.scan.timeout_secs,
        cooldown_secs = cfg.scan.cooldown_secs,
        "Scan limits"
    );
    if cfg.wallet_api.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
        warn!("⚠️ No wallet API key configured, every scan will fail until one is set");
    }

    match args.resolved_command() {
        Commands::CheckConfig => {
            info!("✨ Config is valid");
            return Ok(());
        }
        Commands::Serve => info!("🚀 Starting wallet scanner service..."),
    }

    let metrics: Arc<dyn ScanMetrics> = if cfg.metrics.enable {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, cfg.metrics.prometheus_exporter_port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to install prometheus exporter")?;
        info!("📈 Prometheus exporter listening on {}", addr);
        Arc::new(PrometheusScanMetrics::new("wallet-api"))
    } else {
        Arc::new(NoopScanMetrics::new())
    };

    let board = Arc::new(MessageBoard::with_capacity(cfg.api.max_messages));
    let source = Arc::new(WalletApiClient::new(cfg.wallet_api.clone())?);
    let ctx = ScanContext::new(Arc::new(cfg.scan.clone()), source, board.clone(), metrics);
    let orchestrator = ScanOrchestrator::new(ctx);

    // Create shutdown channel
    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);

    // Spawn signal handler task for Ctrl+C
    let shutdown_tx_sigint = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }

        info!("📡 Received shutdown signal (Ctrl+C)");
        let _ = shutdown_tx_sigint.send(());
    });

    // SIGTERM handler (Unix only)
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_tx_sigterm = shutdown_tx.clone();
        tokio::spawn(async move {
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                info!("📡 Received SIGTERM signal");
                let _ = shutdown_tx_sigterm.send(());
            }
        });
    }

    let app = router(ApiState {
        orchestrator: orchestrator.clone(),
        board,
    });
    let listen_addr: SocketAddr = cfg.api.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("🚀 Command API listening on {}", listener.local_addr()?);
    info!("💡 Press Ctrl+C to stop gracefully");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("🛑 Shutdown signal received, stopping command API");
        })
        .await?;

    if let Some(active) = orchestrator.close().await {
        warn!(
            user_id = active.request.user_id,
            address = %active.request.address,
            started_at = %active.started_at,
            "⚠️ Exiting with a scan still in progress"
        );
    }

    info!("✨ Scanner exited successfully");
    Ok(())
}
