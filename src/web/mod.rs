use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use once_cell::sync::OnceCell;
use salvo::prelude::*;
use tracing::info;

use crate::config::Config;
use crate::db::DatabaseManager;

pub mod handlers;

/// Process-wide application state: the selected configuration plus the
/// database handle (which also owns the migration runner).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_manager: Arc<DatabaseManager>,
    pub started_at: Instant,
}

static APP_STATE: OnceCell<AppState> = OnceCell::new();

pub fn app_state() -> &'static AppState {
    APP_STATE
        .get()
        .expect("app state is not initialized before handler execution")
}

pub fn create_router() -> Router {
    Router::new().get(handlers::index)
}

#[derive(Clone)]
pub struct WebServer {
    config: Arc<Config>,
}

impl WebServer {
    pub async fn new(config: Arc<Config>, db_manager: Arc<DatabaseManager>) -> Result<Self> {
        let _ = APP_STATE.set(AppState {
            config: config.clone(),
            db_manager,
            started_at: Instant::now(),
        });

        Ok(Self { config })
    }

    pub async fn start(&self) -> Result<()> {
        let bind_addr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        );
        info!("Starting web server on {}", bind_addr);

        let acceptor = TcpListener::new(bind_addr).bind().await;
        Server::new(acceptor).serve(create_router()).await;

        Ok(())
    }
}
