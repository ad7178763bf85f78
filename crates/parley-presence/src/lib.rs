//! Parley — Presence Tracker and Typing Indicator.
//!
//! Both state machines keep their only state in the ephemeral store: a live
//! key means online (or typing). Explicit client signals and key expirations
//! are funneled into the same per-key transition function.

pub mod expiration;
pub mod presence;
pub mod typing;

pub use expiration::{ExpiredKey, spawn_expiration_router};
pub use presence::PresenceTracker;
pub use typing::TypingTracker;
