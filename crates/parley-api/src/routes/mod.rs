//! Route modules, one per surface.

pub mod chat;
pub mod health;
pub mod internal;
pub mod queries;
pub mod ws;
