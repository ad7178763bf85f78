//! Parley — Command Processor.
//!
//! Accepts chat writes (send a message, create a room, move a read marker),
//! persists them to the relational write store, and publishes exactly one
//! domain event per accepted write to the durable event log.

pub mod application;
pub mod domain;
