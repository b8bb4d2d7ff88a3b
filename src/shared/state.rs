use crate::config::AppConfig;
use crate::shared::utils::DbPool;

/// Shared per-request state. Handlers hold no other in-process state; agent
/// identity travels in each request, so every call is independently
/// replayable.
#[derive(Clone)]
pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("conn", &"DbPool")
            .field("config", &self.config)
            .finish()
    }
}
