//! Convograph notification fan-out server.
//!
//! Builds the analytics client, graph driver and broker manager, registers a
//! graph-writing handler for every notification exchange, and consumes until
//! the process receives Ctrl+C or SIGTERM.

use convograph_runtime::metrics::{MetricsServer, seed_counters};
use convograph_runtime::{LiveResources, Orchestrator, ServerOptions};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be populated
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,convograph=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting convograph");

    let options = ServerOptions::from_env()?;
    info!(
        bind_port = options.bind_port,
        broker_uri = %options.broker_uri,
        "Configuration loaded"
    );

    let mut metrics = MetricsServer::new(options.clone().with_defaults().metrics_addr());
    metrics.start()?;
    seed_counters();

    let mut orchestrator = Orchestrator::new(options, LiveResources::default())?;

    if let Err(e) = orchestrator.init().await {
        error!(error = %e, "Initialization failed");
        let shutdown = orchestrator.stop().await;
        log_shutdown(&shutdown);
        return Err(e.into());
    }

    match orchestrator.start().await {
        Ok(report) => {
            for failure in report.failures() {
                warn!(
                    exchange = %failure.exchange,
                    error = %failure.error,
                    "Exchange not registered"
                );
            }
            info!(
                registered = report.registered().len(),
                failed = report.failures().len(),
                "Consuming notifications"
            );
        },
        Err(e) => {
            error!(error = %e, "Failed to start consumption");
            let shutdown = orchestrator.stop().await;
            log_shutdown(&shutdown);
            return Err(e.into());
        },
    }

    shutdown_signal().await;

    info!("Shutting down");
    let shutdown = orchestrator.stop().await;
    log_shutdown(&shutdown);

    info!("Convograph stopped");
    Ok(())
}

fn log_shutdown(report: &convograph_runtime::ShutdownReport) {
    if report.is_clean() {
        info!("All resources released");
        return;
    }
    for failure in report.errors() {
        warn!(
            resource = %failure.resource,
            error = %failure.cause,
            "Resource did not shut down cleanly"
        );
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        () = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
