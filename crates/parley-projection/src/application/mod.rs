pub mod directory;
pub mod event_handlers;
pub mod query_handlers;
