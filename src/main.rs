//! EVENTLOG - Flagged Event-Log Service
//! Serves the event API over HTTP on top of the durable log store.

use std::sync::Arc;

use eventlog::api::{self, AppState};
use eventlog::clock::SystemClock;
use eventlog::config::Config;
use eventlog::store::LogStore;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(err) => {
            eprintln!("[ERROR] Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };

    let store = match LogStore::open(config.clone()) {
        Ok(s) => Arc::new(s),
        Err(err) => {
            eprintln!("[ERROR] Failed to open event log: {}", err);
            std::process::exit(1);
        }
    };

    let app = api::router(AppState::new(store.clone(), Arc::new(SystemClock)));

    let listener = match tokio::net::TcpListener::bind(config.listen_addr.as_str()).await {
        Ok(l) => l,
        Err(err) => {
            eprintln!("[ERROR] Failed to bind {}: {}", config.listen_addr, err);
            std::process::exit(1);
        }
    };

    log::info!("Event API listening on {}", config.listen_addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    if let Err(err) = served {
        log::error!("Server stopped with error: {}", err);
    }

    log::info!("{}", store.metrics().report());
}
