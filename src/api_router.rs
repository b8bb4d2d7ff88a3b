//! Combines the API endpoints from all feature modules into a unified router.

use axum::Router;
use std::sync::Arc;

use crate::shared::state::AppState;

/// Configure all API routes from all modules
pub fn configure_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crate::tickets::configure_ticket_routes())
        .merge(crate::agents::configure_agent_routes())
        .merge(crate::canned::configure_canned_routes())
}
