use std::sync::Arc;

use clap::Parser;
use markshelf::auth::Auth;
use markshelf::config::{Cli, Command, Config, default_config_dir, default_config_path};
use markshelf::db::Database;
use markshelf::handler::AppState;
use markshelf::metadata::MetadataClient;
use tokio::{signal, sync::mpsc};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const SESSION_PURGE_INTERVAL_SECS: u64 = 300;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    // With --config the file's directory also holds the database; otherwise
    // both live under ~/.markshelf/
    let (config_path, data_dir) = match args.config_path {
        Some(path) => {
            let path = std::path::PathBuf::from(path);
            let dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| std::path::PathBuf::from("."));
            (path, dir)
        }
        None => (default_config_path(), default_config_dir()),
    };

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("failed to create data directory {:?}: {}", data_dir, e);
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("markshelf.svc starting");

    let cfg = Config::new(&config_path.to_string_lossy()).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?config_path, "failed to load config file");
        std::process::exit(1);
    });
    let db = Arc::new(Database::new(&cfg, &data_dir).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup database");
        std::process::exit(1);
    }));
    if let Err(e) = db.sync().await {
        tracing::warn!(error = %e, "initial sync failed, continuing with local replica");
    }

    if let Some(Command::GrantAdmin { email }) = args.command {
        match Auth::new(db.connection(), cfg.app.session_ttl_hours).grant_admin(&email).await {
            Ok(true) => tracing::info!(email = %email, "admin granted"),
            Ok(false) => {
                tracing::error!(email = %email, "no user with that email");
                std::process::exit(1);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to grant admin");
                std::process::exit(1);
            }
        }
        return;
    }

    let metadata = Arc::new(MetadataClient::new(&cfg.metadata).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup metadata client");
        std::process::exit(1);
    }));

    let address = format!("0.0.0.0:{}", cfg.app.get_port());
    let cancellation_token = CancellationToken::new();
    let (shutdown_complete_tx, mut shutdown_complete_rx) = mpsc::channel::<()>(1);

    let purge_db = db.clone();
    let purge_token = cancellation_token.clone();
    let purge_done = shutdown_complete_tx.clone();
    let session_ttl_hours = cfg.app.session_ttl_hours;
    tokio::spawn(async move {
        let _done = purge_done;
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(SESSION_PURGE_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match Auth::new(purge_db.connection(), session_ttl_hours).purge_expired_sessions().await {
                        Ok(0) => {}
                        Ok(purged) => tracing::info!(purged, "purged expired sessions"),
                        Err(e) => tracing::warn!("Failed to purge expired sessions: {}", e),
                    }
                }
                _ = purge_token.cancelled() => {
                    tracing::info!("Session purge task shutting down");
                    break;
                }
            }
        }
    });

    let app = markshelf::router(AppState {
        db,
        metadata,
        session_ttl_hours,
    });

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("markshelf.svc running on {}", &address);
    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(err) = result {
                tracing::error!(error = %err, "server exited with error");
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("ctrl+c signal received, preparing to shutdown");
            cancellation_token.cancel();
        }
    }

    drop(shutdown_complete_tx);
    shutdown_complete_rx.recv().await;
    tracing::info!("markshelf.svc going off, graceful shutdown complete");
}
