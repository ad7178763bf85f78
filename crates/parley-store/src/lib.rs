//! Parley write store — relational persistence for rooms, participants,
//! messages and read markers.

pub mod memory_chat_repository;
pub mod pg_chat_repository;
pub mod schema;
