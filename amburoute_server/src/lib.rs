use std::net::SocketAddr;

use amburoute::{GeoPoint, GpsStore};
use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

/// Body of `POST /update_gps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsUpdate {
    pub ambulance_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Reply to `POST /update_gps`, echoing what was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsAck {
    pub status: String,
    pub ambulance_id: String,
    /// `[latitude, longitude]`
    pub location: (f64, f64),
}

/// A running server: its bound address and the task serving it.
#[derive(Debug)]
pub struct ServerHandle {
    pub addr: SocketAddr,
    pub task: tokio::task::JoinHandle<()>,
}

async fn update_gps(State(store): State<GpsStore>, Json(update): Json<GpsUpdate>) -> Json<GpsAck> {
    let location = GeoPoint::new(update.latitude, update.longitude);
    store.update(update.ambulance_id.clone(), location);
    log::info!("gps update for {}: {}", update.ambulance_id, location);
    Json(GpsAck {
        status: "updated".to_string(),
        ambulance_id: update.ambulance_id,
        location: location.as_tuple(),
    })
}

/// Routes served by the GPS ingestion endpoint, backed by `store`.
pub fn router(store: GpsStore) -> Router {
    Router::new()
        .route("/update_gps", post(update_gps))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(store)
}

/// Binds `cfg.bind_addr` and serves the router on a spawned task.
///
/// Must be called from within a tokio runtime. Binding `:0` picks a free port;
/// the actual address is in the returned handle.
pub async fn start_server(store: GpsStore, cfg: ServerConfig) -> anyhow::Result<ServerHandle> {
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind_addr))?;
    let addr = listener.local_addr()?;
    let app = router(store);

    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            log::error!("gps server stopped: {}", err);
        }
    });
    log::info!("gps server listening on http://{}", addr);

    Ok(ServerHandle { addr, task })
}
