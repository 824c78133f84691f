use std::net::SocketAddr;
use std::sync::Arc;

mod catalog;
mod config;
mod extract;
mod models;
mod notion;
mod relay;
mod routes;
mod sanitize;
#[cfg(test)]
mod stubs;

use catalog::AladinClient;
use config::Config;
use notion::NotionClient;
use relay::Relay;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let catalog = Arc::new(AladinClient::new(&config)?);
    let notes = Arc::new(NotionClient::new(&config)?);
    let relay = Relay::new(&config, catalog, notes);
    let app = routes::router(relay, &config.static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        static_dir = %config.static_dir.display(),
        max_results = config.search_max_results,
        "listening on http://{}",
        listener.local_addr()?
    );
    axum::serve(listener, app).await?;
    Ok(())
}
