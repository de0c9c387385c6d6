use anyhow::{Context, Result};
use battery_logger::{
    AppState, build_router,
    config::{Config, StoreKind},
    sheet::{CsvWorkbook, MemoryWorkbook, Workbook},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    eprintln!("[battery-logger] booting...");

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(variant = %config.variant, sheet = %config.sheet, "battery-logger starting up");

    let workbook: Arc<dyn Workbook> = match config.store {
        StoreKind::Csv => {
            let book = CsvWorkbook::new(config.data_dir.clone());
            book.ensure_sheet(&config.sheet)
                .await
                .with_context(|| format!("failed to prepare sheet in {}", config.data_dir.display()))?;
            tracing::info!(dir = %book.dir().display(), "csv store ready");
            Arc::new(book)
        }
        StoreKind::Memory => {
            let book = MemoryWorkbook::new();
            book.add_sheet(&config.sheet).await;
            tracing::warn!("memory store in use; rows are lost on restart");
            Arc::new(book)
        }
    };

    let app = build_router(AppState {
        workbook,
        sheet_name: config.sheet.clone(),
        variant: config.variant,
    });

    let addr = config.addr()?;
    tracing::info!("battery-logger listening on http://{addr}");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("battery-logger shutdown complete");
    Ok(())
}

/// Resolves on the first of SIGINT/ctrl-c or, on unix, SIGTERM. A handler
/// that cannot be installed simply never fires.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = interrupt => "interrupt",
        _ = terminate => "terminate",
    };
    tracing::info!(signal = received, "shutdown requested; draining connections");
}
