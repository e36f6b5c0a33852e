pub mod catalog_filter;
pub mod catalog_service;
pub mod chat_flow;
pub mod chat_service;
pub mod lead_service;
pub mod notifier;
pub mod query_state;
pub mod rate_limiter;
