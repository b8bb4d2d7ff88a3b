//! Ticket lifecycle: inbound contact intake, the agent claim protocol, message
//! posting, and status transitions.
//!
//! A ticket moves OPEN → ONGOING → CLOSED. It is unassigned exactly while
//! OPEN; the claim is a single conditional UPDATE so that two agents can never
//! both win the same ticket (see [`assign_open_ticket`]).

pub mod queue;

use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::error;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::agents::find_or_create_agent;
use crate::customers::{find_or_create_customer, Customer};
use crate::shared::errors::ServiceError;
use crate::shared::schema::{messages, tickets};
use crate::shared::state::AppState;
use crate::shared::utils::get_conn;

pub const STATUS_OPEN: &str = "OPEN";
pub const STATUS_ONGOING: &str = "ONGOING";
pub const STATUS_CLOSED: &str = "CLOSED";
pub const TICKET_STATUSES: [&str; 3] = [STATUS_OPEN, STATUS_ONGOING, STATUS_CLOSED];

// 'URGENT' > 'NORMAL' lexicographically, so `ORDER BY priority DESC` ranks
// urgent tickets first without a separate rank column.
pub const PRIORITY_URGENT: &str = "URGENT";
pub const PRIORITY_NORMAL: &str = "NORMAL";

pub const SENDER_CUSTOMER: &str = "CUSTOMER";
pub const SENDER_AGENT: &str = "AGENT";
pub const SENDER_SYSTEM: &str = "SYSTEM";
pub const SENDER_TYPES: [&str; 3] = [SENDER_CUSTOMER, SENDER_AGENT, SENDER_SYSTEM];

const URGENT_KEYWORDS: [&str; 6] = [
    "loan",
    "disbursement",
    "approve",
    "money",
    "urgent",
    "emergency",
];

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = tickets)]
pub struct Ticket {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub loan_amount: i32,
    pub status: String,
    pub priority: String,
    pub assigned_agent_id: Option<Uuid>,
    pub last_message_preview: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub sender_type: String,
    pub sender_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub agent_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub sender_type: String,
    pub sender_name: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct InboundContactRequest {
    pub name: String,
    pub phone: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct InboundContactResponse {
    pub ticket_id: Uuid,
    pub customer_id: Uuid,
    pub priority: String,
}

#[derive(Debug, Serialize)]
pub struct TicketDetail {
    pub ticket: Ticket,
    pub customer: Option<Customer>,
    pub messages: Vec<Message>,
}

/// URGENT when the text mentions any loan-desk escalation keyword,
/// case-insensitively.
pub fn classify_priority(text: &str) -> &'static str {
    let lowered = text.to_lowercase();
    if URGENT_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        PRIORITY_URGENT
    } else {
        PRIORITY_NORMAL
    }
}

/// The claim itself: one conditional UPDATE applied by the database as a
/// single indivisible operation. Under N concurrent attempts on the same OPEN
/// ticket, exactly one caller gets the updated row back; the rest get `None`.
/// Never split this into a read followed by a write.
pub fn assign_open_ticket(
    conn: &mut PgConnection,
    ticket_id: Uuid,
    agent_id: Uuid,
) -> QueryResult<Option<Ticket>> {
    diesel::update(
        tickets::table
            .filter(tickets::id.eq(ticket_id))
            .filter(tickets::status.eq(STATUS_OPEN)),
    )
    .set((
        tickets::status.eq(STATUS_ONGOING),
        tickets::assigned_agent_id.eq(Some(agent_id)),
        tickets::updated_at.eq(Utc::now()),
    ))
    .get_result(conn)
    .optional()
}

pub async fn claim_ticket(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<Ticket>, ServiceError> {
    if req.agent_name.is_empty() {
        return Err(ServiceError::Validation("agent name is required".to_string()));
    }

    let mut conn = get_conn(&state.conn)?;
    // Identity upsert happens before, and outside of, the atomic claim step.
    let agent = find_or_create_agent(&mut conn, &req.agent_name)?;

    match assign_open_ticket(&mut conn, ticket_id, agent.id)? {
        Some(ticket) => Ok(Json(ticket)),
        None => {
            // Losers must be able to tell "raced and lost" from "no such
            // ticket"; no automatic retry, the agent re-polls the queue.
            let exists: i64 = tickets::table
                .filter(tickets::id.eq(ticket_id))
                .count()
                .get_result(&mut conn)?;
            if exists == 0 {
                Err(ServiceError::NotFound("ticket"))
            } else {
                Err(ServiceError::Conflict(
                    "ticket already assigned or closed".to_string(),
                ))
            }
        }
    }
}

pub async fn change_status(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<Uuid>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<Ticket>, ServiceError> {
    if !TICKET_STATUSES.contains(&req.status.as_str()) {
        return Err(ServiceError::Validation(format!(
            "invalid status: {}",
            req.status
        )));
    }

    let mut conn = get_conn(&state.conn)?;
    let updated: Option<Ticket> =
        diesel::update(tickets::table.filter(tickets::id.eq(ticket_id)))
            .set((
                tickets::status.eq(&req.status),
                tickets::updated_at.eq(Utc::now()),
            ))
            .get_result(&mut conn)
            .optional()?;

    updated.map(Json).ok_or(ServiceError::NotFound("ticket"))
}

pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<Uuid>,
    Json(req): Json<PostMessageRequest>,
) -> Result<Json<Message>, ServiceError> {
    if req.sender_type.is_empty() || req.sender_name.is_empty() || req.text.is_empty() {
        return Err(ServiceError::Validation(
            "sender type, name, and text are required".to_string(),
        ));
    }
    if !SENDER_TYPES.contains(&req.sender_type.as_str()) {
        return Err(ServiceError::Validation(format!(
            "invalid sender type: {}",
            req.sender_type
        )));
    }

    let mut conn = get_conn(&state.conn)?;
    let ticket: Ticket = tickets::table
        .filter(tickets::id.eq(ticket_id))
        .first(&mut conn)
        .optional()?
        .ok_or(ServiceError::NotFound("ticket"))?;
    if ticket.status == STATUS_CLOSED {
        return Err(ServiceError::ClosedTicket);
    }

    let now = Utc::now();
    let message = Message {
        id: Uuid::new_v4(),
        ticket_id,
        sender_type: req.sender_type,
        sender_name: req.sender_name,
        text: req.text,
        created_at: now,
    };
    diesel::insert_into(messages::table)
        .values(&message)
        .execute(&mut conn)?;

    // The message is durable from here on; a failed preview mirror must not
    // undo it.
    if let Err(e) = diesel::update(tickets::table.filter(tickets::id.eq(ticket_id)))
        .set((
            tickets::last_message_preview.eq(Some(message.text.clone())),
            tickets::last_message_at.eq(Some(now)),
            tickets::updated_at.eq(now),
        ))
        .execute(&mut conn)
    {
        error!("failed to mirror last message onto ticket {ticket_id}: {e}");
    }

    Ok(Json(message))
}

pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InboundContactRequest>,
) -> Result<Json<InboundContactResponse>, ServiceError> {
    if req.name.is_empty() || req.phone.is_empty() || req.message.is_empty() {
        return Err(ServiceError::Validation(
            "name, phone, and message are required".to_string(),
        ));
    }

    let mut conn = get_conn(&state.conn)?;
    let customer = find_or_create_customer(&mut conn, &req.name, &req.phone)?;

    let priority = classify_priority(&req.message);
    let loan_amount = rand::thread_rng().gen_range(1000..=99999);
    let now = Utc::now();

    // Each inbound contact opens a fresh ticket; conversations never reuse an
    // earlier one.
    let ticket = Ticket {
        id: Uuid::new_v4(),
        customer_id: customer.id,
        loan_amount,
        status: STATUS_OPEN.to_string(),
        priority: priority.to_string(),
        assigned_agent_id: None,
        last_message_preview: Some(req.message.clone()),
        last_message_at: Some(now),
        notes: None,
        created_at: now,
        updated_at: now,
    };
    diesel::insert_into(tickets::table)
        .values(&ticket)
        .execute(&mut conn)?;

    let message = Message {
        id: Uuid::new_v4(),
        ticket_id: ticket.id,
        sender_type: SENDER_CUSTOMER.to_string(),
        sender_name: req.name,
        text: req.message,
        created_at: now,
    };
    diesel::insert_into(messages::table)
        .values(&message)
        .execute(&mut conn)?;

    Ok(Json(InboundContactResponse {
        ticket_id: ticket.id,
        customer_id: customer.id,
        priority: priority.to_string(),
    }))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<Uuid>,
) -> Result<Json<TicketDetail>, ServiceError> {
    use crate::shared::schema::customers;

    let mut conn = get_conn(&state.conn)?;
    let (ticket, customer): (Ticket, Option<Customer>) = tickets::table
        .left_join(customers::table)
        .filter(tickets::id.eq(ticket_id))
        .first(&mut conn)
        .optional()?
        .ok_or(ServiceError::NotFound("ticket"))?;

    let history = messages::table
        .filter(messages::ticket_id.eq(ticket_id))
        .order(messages::created_at.asc())
        .load(&mut conn)?;

    Ok(Json(TicketDetail {
        ticket,
        customer,
        messages: history,
    }))
}

pub fn configure_ticket_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/agent/tickets", get(queue::list_tickets))
        .route("/api/agent/tickets/:ticket_id/assign", post(claim_ticket))
        .route("/api/customer/tickets", post(create_ticket))
        .route("/api/tickets/:ticket_id", get(get_ticket))
        .route("/api/tickets/:ticket_id/messages", post(post_message))
        .route("/api/tickets/:ticket_id/status", patch(change_status))
}
