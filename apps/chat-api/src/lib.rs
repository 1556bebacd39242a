pub mod auth;
pub mod config;
pub mod db;
pub mod delivery;
pub mod error;
pub mod gateway;
pub mod membership;
pub mod models;
pub mod notifier;
pub mod routes;

use std::sync::Arc;

use config::Config;
use db::pool::DbPool;
use gateway::hub::Hub;
use notifier::Notifier;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
    /// Handle to the realtime connection hub.
    pub hub: Hub,
    /// Outbound notification delivery.
    pub notifier: Arc<dyn Notifier>,
}
