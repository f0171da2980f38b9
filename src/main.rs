use mimalloc::MiMalloc;
use std::net::SocketAddr;
use std::sync::Arc;
use switchyard::server::router::{SwitchyardState, switchyard_router};
use switchyard::switch::SwitchCoordinator;
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = &switchyard::config::CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_path = %cfg.store.database_path.display(),
        mirror_path = %cfg.store.mirror_path.display(),
        lock_path = %cfg.store.lock_path.display(),
        apps = ?cfg.switch.apps.keys().collect::<Vec<_>>(),
        loglevel = %cfg.basic.loglevel,
        listen_addr = %cfg.basic.listen_addr,
        listen_port = cfg.basic.listen_port,
    );

    if !cfg.store.is_available() && !cfg.store.create_if_missing {
        return Err(switchyard::SwitchyardError::DatabaseMissing(
            cfg.store.database_path.display().to_string(),
        )
        .into());
    }

    // An existing catalog never receives DDL.
    let bootstrap_schema = cfg.store.create_if_missing && !cfg.store.is_available();
    let db = switchyard::db::spawn(&cfg.store.database_url(), bootstrap_schema).await?;
    let coordinator = SwitchCoordinator::new(db, cfg.switch());

    let report = coordinator.startup_consistency_check().await;
    if report.failures.is_empty() {
        info!(
            repaired_settings = report.repaired_settings.len(),
            repaired_mirror = report.repaired_mirror.len(),
            "Startup consistency check finished."
        );
    } else {
        warn!(
            failures = ?report.failures,
            "Startup consistency check finished with failures."
        );
    }

    let state = SwitchyardState::new(coordinator, Arc::from(cfg.basic.switch_key.as_str()));
    let app = switchyard_router(state);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
