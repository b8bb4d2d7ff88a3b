//! The agent queue: tab visibility rules, free-text search, and the random
//! sample served for the open tab.
//!
//! Visibility per tab:
//! - OPEN: every open ticket, any requester.
//! - ONGOING / CLOSED: only tickets assigned to the requesting agent; an
//!   unknown or absent agent sees an empty list.
//! - ALL (global search): OPEN plus the requester's own ONGOING and CLOSED
//!   tickets; an anonymous requester gets OPEN and ONGOING unscoped.

use axum::{
    extract::{Query, State},
    Json,
};
use diesel::define_sql_function;
use diesel::prelude::*;
use diesel::sql_types::Double;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::agents::find_agent;
use crate::customers::Customer;
use crate::shared::errors::ServiceError;
use crate::shared::schema::{customers, tickets};
use crate::shared::state::AppState;
use crate::shared::utils::get_conn;
use crate::tickets::{Ticket, STATUS_CLOSED, STATUS_ONGOING, STATUS_OPEN, TICKET_STATUSES};

pub const TAB_ALL: &str = "ALL";
pub const DEFAULT_LIMIT: i64 = 10;
/// Served for the open tab so agents browsing at the same moment see
/// different heads and don't all race to claim one ticket.
pub const OPEN_SAMPLE_SIZE: i64 = 5;

define_sql_function! {
    /// SQL `random()`; sampling happens in the store, not in process memory.
    fn random() -> Double;
}

#[derive(Debug, Deserialize)]
pub struct ListTicketsQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub agent_name: Option<String>,
    pub limit: Option<String>,
}

/// A queue row: the ticket plus its owning customer resolved at read time.
#[derive(Debug, Serialize)]
pub struct TicketWithCustomer {
    pub ticket: Ticket,
    pub customer: Option<Customer>,
}

fn into_view((ticket, customer): (Ticket, Option<Customer>)) -> TicketWithCustomer {
    TicketWithCustomer { ticket, customer }
}

/// A garbage limit falls back to the default instead of failing the request.
fn effective_limit(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.parse::<i64>().ok())
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_LIMIT)
}

fn sort_for_display(rows: &mut [(Ticket, Option<Customer>)]) {
    rows.sort_by(|(a, _), (b, _)| {
        b.priority
            .cmp(&a.priority)
            .then(b.last_message_at.cmp(&a.last_message_at))
    });
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListTicketsQuery>,
) -> Result<Json<Vec<TicketWithCustomer>>, ServiceError> {
    let tab = params.status.as_deref().unwrap_or(STATUS_OPEN);
    if tab != TAB_ALL && !TICKET_STATUSES.contains(&tab) {
        return Err(ServiceError::Validation(format!("invalid status tab: {tab}")));
    }
    let limit = effective_limit(params.limit.as_deref());
    let search = params.search.as_deref().filter(|s| !s.is_empty());

    let mut conn = get_conn(&state.conn)?;

    // Open tab without search text: a random sample instead of a
    // deterministic top-N. The sampled batch is still sorted for display.
    if tab == STATUS_OPEN && search.is_none() {
        let mut rows: Vec<(Ticket, Option<Customer>)> = tickets::table
            .left_join(customers::table)
            .filter(tickets::status.eq(STATUS_OPEN))
            .order(random())
            .limit(OPEN_SAMPLE_SIZE)
            .load(&mut conn)?;
        sort_for_display(&mut rows);
        return Ok(Json(rows.into_iter().map(into_view).collect()));
    }

    let requester = match params.agent_name.as_deref().filter(|n| !n.is_empty()) {
        Some(name) => find_agent(&mut conn, name)?,
        None => None,
    };

    let mut q = tickets::table.left_join(customers::table).into_boxed();

    match tab {
        TAB_ALL => match &requester {
            Some(agent) => {
                q = q.filter(
                    tickets::status
                        .eq(STATUS_OPEN)
                        .nullable()
                        .or(tickets::status
                            .eq(STATUS_ONGOING)
                            .nullable()
                            .and(tickets::assigned_agent_id.eq(agent.id)))
                        .or(tickets::status
                            .eq(STATUS_CLOSED)
                            .nullable()
                            .and(tickets::assigned_agent_id.eq(agent.id))),
                );
            }
            None => {
                q = q.filter(tickets::status.eq_any(vec![STATUS_OPEN, STATUS_ONGOING]));
            }
        },
        STATUS_OPEN => {
            q = q.filter(tickets::status.eq(STATUS_OPEN));
        }
        owned => {
            let Some(agent) = &requester else {
                return Ok(Json(Vec::new()));
            };
            q = q
                .filter(tickets::status.eq(owned.to_string()))
                .filter(tickets::assigned_agent_id.eq(agent.id));
        }
    }

    if let Some(search) = search {
        let pattern = format!("%{search}%");
        q = q.filter(
            customers::name
                .ilike(pattern.clone())
                .nullable()
                .or(customers::phone.ilike(pattern.clone()).nullable())
                .or(tickets::last_message_preview.ilike(pattern)),
        );
    }

    let rows: Vec<(Ticket, Option<Customer>)> = q
        .order((
            tickets::priority.desc(),
            tickets::last_message_at.desc().nulls_last(),
        ))
        .limit(limit)
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(into_view).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn ticket(priority: &str, last_message_at: Option<i64>) -> (Ticket, Option<Customer>) {
        let now = Utc::now();
        (
            Ticket {
                id: Uuid::new_v4(),
                customer_id: Uuid::new_v4(),
                loan_amount: 5000,
                status: STATUS_OPEN.to_string(),
                priority: priority.to_string(),
                assigned_agent_id: None,
                last_message_preview: None,
                last_message_at: last_message_at
                    .map(|secs| Utc.timestamp_opt(secs, 0).unwrap()),
                notes: None,
                created_at: now,
                updated_at: now,
            },
            None,
        )
    }

    #[test]
    fn test_effective_limit() {
        assert_eq!(effective_limit(None), DEFAULT_LIMIT);
        assert_eq!(effective_limit(Some("25")), 25);
        assert_eq!(effective_limit(Some("not-a-number")), DEFAULT_LIMIT);
        assert_eq!(effective_limit(Some("-3")), DEFAULT_LIMIT);
        assert_eq!(effective_limit(Some("0")), DEFAULT_LIMIT);
    }

    #[test]
    fn test_display_sort_urgent_first_then_recency() {
        let mut rows = vec![
            ticket("NORMAL", Some(300)),
            ticket("URGENT", Some(100)),
            ticket("NORMAL", Some(200)),
            ticket("URGENT", Some(400)),
        ];
        sort_for_display(&mut rows);
        let key: Vec<(String, Option<_>)> = rows
            .iter()
            .map(|(t, _)| (t.priority.clone(), t.last_message_at))
            .collect();
        assert_eq!(key[0].0, "URGENT");
        assert_eq!(key[1].0, "URGENT");
        assert!(key[0].1 > key[1].1);
        assert_eq!(key[2].0, "NORMAL");
        assert!(key[2].1 > key[3].1);
    }

    #[test]
    fn test_display_sort_missing_timestamp_last() {
        let mut rows = vec![ticket("NORMAL", None), ticket("NORMAL", Some(100))];
        sort_for_display(&mut rows);
        assert!(rows[0].0.last_message_at.is_some());
        assert!(rows[1].0.last_message_at.is_none());
    }

    #[test]
    fn test_list_query_parse() {
        let params: ListTicketsQuery = serde_json::from_str(
            r#"{"status": "ONGOING", "agent_name": "Meera", "limit": "5"}"#,
        )
        .unwrap();
        assert_eq!(params.status.as_deref(), Some(STATUS_ONGOING));
        assert_eq!(params.agent_name.as_deref(), Some("Meera"));
        assert!(params.search.is_none());
    }
}
