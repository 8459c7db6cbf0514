pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod routes;
pub mod slug;
pub mod ws;

use config::Config;
use std::sync::Arc;

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub broadcaster: Arc<ws::broadcaster::Broadcaster>,
    pub codec: Arc<dyn codec::ContentCodec>,
}
