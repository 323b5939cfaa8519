use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::core::shared::utils::DbPool;
use crate::invoicing::breaker::CircuitBreaker;
use crate::invoicing::client::ItaClient;

/// Shared application state, built once at start-up and handed to every
/// router as `State<Arc<AppState>>`.
pub struct AppState {
    pub conn: DbPool,
    pub config: Arc<AppConfig>,
    pub ita_client: Arc<dyn ItaClient>,
    pub ita_breaker: Arc<CircuitBreaker>,
}

impl AppState {
    pub fn new(conn: DbPool, config: AppConfig, ita_client: Arc<dyn ItaClient>) -> Self {
        let ita_breaker = Arc::new(CircuitBreaker::new(
            config.ita.breaker_failure_threshold,
            std::time::Duration::from_secs(config.ita.breaker_cooldown_secs),
        ));
        Self {
            conn,
            config: Arc::new(config),
            ita_client,
            ita_breaker,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("pool_state", &self.conn.state())
            .field("ita_breaker", &self.ita_breaker.snapshot())
            .finish_non_exhaustive()
    }
}
