//! enrollsync worker
//!
//! Runs the enroll, confirm and retire flows on their timers against the
//! Postgres device registry and Microsoft Intune.

mod config;
mod logging;

use std::sync::Arc;

use secrecy::ExposeSecret;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use enrollsync_connector_entra::{
    EntraConfig, EntraCredentials, GraphClient, IntuneDirectory, IntuneInventory,
};
use enrollsync_db::{run_migrations, DbPool, PgDeviceRegistry, PgTagPolicyStore};
use enrollsync_reconciler::{FlowScheduler, Reconciler};

use crate::config::WorkerConfig;

#[tokio::main]
async fn main() {
    // Load configuration (fail-fast on missing required values)
    let config = match WorkerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.rust_log);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        tenant_id = %config.tenant_id,
        cloud = %config.cloud,
        "Starting enrollsync worker"
    );

    if config.sync.sync_switch().is_none() {
        warn!("SYNC_ENABLED is unset or invalid; enroll and confirm runs will be no-ops");
    }
    if let Err(e) = config.sync.confirm_cutoff(chrono::Utc::now()) {
        warn!(error = %e, "Confirm runs will abort until the interval is fixed");
    }

    let pool = match DbPool::connect_with(
        config.database_url.expose_secret(),
        config.db_max_connections,
    )
    .await
    {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        }
    };
    info!(max_connections = config.db_max_connections, "Database pool created");

    if config.run_migrations {
        if let Err(e) = run_migrations(&pool).await {
            error!(error = %e, "Failed to run migrations");
            std::process::exit(1);
        }
        info!("Database migrations applied");
    }

    let entra_config = match EntraConfig::builder()
        .tenant_id(config.tenant_id.clone())
        .cloud_environment(config.cloud.clone())
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Invalid Graph configuration");
            std::process::exit(1);
        }
    };
    let credentials = EntraCredentials {
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
    };
    let graph = match GraphClient::new(&entra_config, credentials) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to create Graph client");
            std::process::exit(1);
        }
    };
    info!(graph_base_url = %graph.base_url(), "Graph client created");

    let reconciler = Reconciler::new(
        Arc::new(PgDeviceRegistry::new(pool.clone())),
        Arc::new(PgTagPolicyStore::new(pool.clone())),
        Arc::new(IntuneDirectory::new(graph.clone())),
        Arc::new(IntuneInventory::new(graph)),
        config.sync.clone(),
    );

    let shutdown = CancellationToken::new();
    let scheduler = FlowScheduler::new(Arc::new(reconciler), config.schedule);
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown.clone()));

    shutdown_signal().await;
    shutdown.cancel();

    if let Err(e) = scheduler_handle.await {
        error!(error = %e, "Flow scheduler task failed");
    }

    pool.close().await;
    info!("enrollsync worker stopped");
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            // Fall through and keep waiting for SIGTERM
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, finishing in-flight runs");
        }
        () = terminate => {
            info!("Received SIGTERM, finishing in-flight runs");
        }
    }
}
