//! Parley ephemeral state store.
//!
//! Backs presence and typing state. A key exists only while its TTL has not
//! elapsed; when it elapses the key is removed and its name is published on
//! the expiration feed.

mod store;

pub use store::InMemoryEphemeralStore;
