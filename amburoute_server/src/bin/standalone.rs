use amburoute::GpsStore;
use amburoute_server::{DEFAULT_BIND_ADDR, ServerConfig, start_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Bind address from env or default
    let bind = std::env::var("AMBU_BIND").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

    let store = GpsStore::new();
    let handle = start_server(store, ServerConfig { bind_addr: bind }).await?;
    // Park forever
    handle.task.await.ok();
    Ok(())
}
