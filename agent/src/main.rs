use std::sync::Arc;
use anyhow::Result;
use log::info;
use tokio::net::TcpListener;

use common::Config;
use dtperm_agent::{api, Account};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = Config::default_path();
    let config = Config::resolve(&config_path)?;
    if let Some(path) = common::logging::init(&config.logging)? {
        eprintln!("Logging to {}", path.display());
    }

    info!("Starting dtperm agent");
    info!("Config resolved from {}", config_path);

    let account = Account::from_config(&config)?;
    info!("{} ready, defaults at {}", account, config.defaults.path);

    let app = api::router(Arc::new(account));
    let listener = TcpListener::bind(&config.server.bind).await?;
    info!("HTTP API listening on {}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
