#![forbid(unsafe_code)]
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

mod config;
mod db;
mod utils;
mod web;

use config::Config;
use web::WebServer;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(Config::load()?);
    utils::logging::init_tracing(&config.logging);
    info!("salvo-diesel-starter starting up");

    let db_manager = Arc::new(db::DatabaseManager::new(&config.database).await?);
    db_manager.migrate().await?;

    let web_server = WebServer::new(config.clone(), db_manager.clone()).await?;
    web_server.start().await?;

    info!("salvo-diesel-starter shutting down");
    Ok(())
}
