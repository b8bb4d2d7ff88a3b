//! Agent identity and per-agent counters.
//!
//! There is no authentication: the agent's name is the identity key, upserted
//! lazily on login or on a first claim attempt.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::errors::ServiceError;
use crate::shared::schema::{agents, tickets};
use crate::shared::state::AppState;
use crate::shared::utils::get_conn;
use crate::tickets::{STATUS_CLOSED, STATUS_ONGOING};

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = agents)]
pub struct Agent {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AgentQuery {
    pub agent_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OngoingCount {
    pub ongoing_count: i64,
}

#[derive(Debug, Serialize)]
pub struct AgentStats {
    pub completed_count: i64,
}

pub fn find_agent(conn: &mut PgConnection, name: &str) -> QueryResult<Option<Agent>> {
    agents::table
        .filter(agents::name.eq(name))
        .first::<Agent>(conn)
        .optional()
}

/// Find-or-create by name. Same documented race as the customer upsert: the
/// existence check and the insert are not one atomic step.
pub fn find_or_create_agent(conn: &mut PgConnection, name: &str) -> QueryResult<Agent> {
    if let Some(existing) = find_agent(conn, name)? {
        return Ok(existing);
    }

    let agent = Agent {
        id: Uuid::new_v4(),
        name: name.to_string(),
        created_at: Utc::now(),
    };
    diesel::insert_into(agents::table)
        .values(&agent)
        .execute(conn)?;
    Ok(agent)
}

pub async fn login_agent(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Agent>, ServiceError> {
    if req.name.is_empty() {
        return Err(ServiceError::Validation("agent name is required".to_string()));
    }

    let mut conn = get_conn(&state.conn)?;
    let agent = find_or_create_agent(&mut conn, &req.name)?;
    Ok(Json(agent))
}

pub async fn ongoing_count(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgentQuery>,
) -> Result<Json<OngoingCount>, ServiceError> {
    let name = query
        .agent_name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ServiceError::Validation("agent name is required".to_string()))?;

    let mut conn = get_conn(&state.conn)?;
    let Some(agent) = find_agent(&mut conn, &name)? else {
        return Ok(Json(OngoingCount { ongoing_count: 0 }));
    };

    let ongoing_count = tickets::table
        .filter(tickets::assigned_agent_id.eq(agent.id))
        .filter(tickets::status.eq(STATUS_ONGOING))
        .count()
        .get_result(&mut conn)?;

    Ok(Json(OngoingCount { ongoing_count }))
}

pub async fn agent_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgentQuery>,
) -> Result<Json<AgentStats>, ServiceError> {
    let name = query
        .agent_name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ServiceError::Validation("agent name is required".to_string()))?;

    let mut conn = get_conn(&state.conn)?;
    let Some(agent) = find_agent(&mut conn, &name)? else {
        return Ok(Json(AgentStats { completed_count: 0 }));
    };

    let completed_count = tickets::table
        .filter(tickets::assigned_agent_id.eq(agent.id))
        .filter(tickets::status.eq(STATUS_CLOSED))
        .count()
        .get_result(&mut conn)?;

    Ok(Json(AgentStats { completed_count }))
}

pub fn configure_agent_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/agent/login", post(login_agent))
        .route("/api/agent/ongoing-count", get(ongoing_count))
        .route("/api/agent/stats", get(agent_stats))
}
