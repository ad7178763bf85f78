//! Parley — Projection Engine.
//!
//! Consumes the event log and maintains denormalized read models
//! (conversation views, message history, read markers) under redelivery,
//! emitting derived events whenever a view or an unread flag changes.

pub mod application;
pub mod domain;
pub mod error;
pub mod memory_store;
pub mod pg_store;

pub use application::directory::ReadModelDirectory;
pub use application::event_handlers::ProjectionEngine;
pub use memory_store::InMemoryReadModelStore;
pub use pg_store::PgReadModelStore;
