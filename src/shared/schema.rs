diesel::table! {
    customers (id) {
        id -> Uuid,
        name -> Varchar,
        phone -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    agents (id) {
        id -> Uuid,
        name -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    tickets (id) {
        id -> Uuid,
        customer_id -> Uuid,
        loan_amount -> Int4,
        status -> Varchar,
        priority -> Varchar,
        assigned_agent_id -> Nullable<Uuid>,
        last_message_preview -> Nullable<Text>,
        last_message_at -> Nullable<Timestamptz>,
        notes -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    messages (id) {
        id -> Uuid,
        ticket_id -> Uuid,
        sender_type -> Varchar,
        sender_name -> Varchar,
        text -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    canned_responses (id) {
        id -> Uuid,
        title -> Varchar,
        body -> Text,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(tickets -> customers (customer_id));
diesel::joinable!(messages -> tickets (ticket_id));

diesel::allow_tables_to_appear_in_same_query!(customers, agents, tickets, messages, canned_responses,);
