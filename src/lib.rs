pub mod agents;
pub mod api_router;
pub mod canned;
pub mod config;
pub mod customers;
pub mod shared;
pub mod tickets;
