//! Parley Core — shared domain vocabulary.
//!
//! This crate defines the identifiers, events, read-model documents,
//! real-time destinations and port traits that every other crate depends on.
//! It contains no infrastructure code.

pub mod clock;
pub mod directory;
pub mod ephemeral;
pub mod error;
pub mod event;
pub mod ids;
pub mod model;
pub mod publisher;
pub mod realtime;
pub mod repository;
pub mod sync;
