use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::schema::customers;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = customers)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

/// Find-or-create by phone. Phone carries no unique index, so two concurrent
/// first contacts can both insert; later lookups settle on the first row.
pub fn find_or_create_customer(
    conn: &mut PgConnection,
    name: &str,
    phone: &str,
) -> QueryResult<Customer> {
    if let Some(existing) = customers::table
        .filter(customers::phone.eq(phone))
        .first::<Customer>(conn)
        .optional()?
    {
        return Ok(existing);
    }

    let customer = Customer {
        id: Uuid::new_v4(),
        name: name.to_string(),
        phone: phone.to_string(),
        created_at: Utc::now(),
    };
    diesel::insert_into(customers::table)
        .values(&customer)
        .execute(conn)?;
    Ok(customer)
}
