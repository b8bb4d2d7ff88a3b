use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::errors::ServiceError;
use crate::shared::schema::canned_responses;
use crate::shared::state::AppState;
use crate::shared::utils::get_conn;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = canned_responses)]
pub struct CannedResponse {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCannedResponseRequest {
    pub title: String,
    pub body: String,
}

pub async fn list_canned_responses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CannedResponse>>, ServiceError> {
    let mut conn = get_conn(&state.conn)?;
    let responses = canned_responses::table
        .order(canned_responses::title.asc())
        .load(&mut conn)?;
    Ok(Json(responses))
}

pub async fn create_canned_response(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCannedResponseRequest>,
) -> Result<Json<CannedResponse>, ServiceError> {
    if req.title.is_empty() || req.body.is_empty() {
        return Err(ServiceError::Validation(
            "title and body are required".to_string(),
        ));
    }

    let mut conn = get_conn(&state.conn)?;
    let response = CannedResponse {
        id: Uuid::new_v4(),
        title: req.title,
        body: req.body,
        created_at: Utc::now(),
    };
    diesel::insert_into(canned_responses::table)
        .values(&response)
        .execute(&mut conn)?;
    Ok(Json(response))
}

pub fn configure_canned_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/agent/canned-responses",
        get(list_canned_responses).post(create_canned_response),
    )
}
