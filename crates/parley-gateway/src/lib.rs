//! Parley — Real-Time Gateway.
//!
//! Authenticates connections, authorizes room-scoped subscriptions against
//! room membership, and fans records out from the event log and from the
//! presence/typing trackers to every subscribed connection.

pub mod auth;
pub mod authorizer;
pub mod dispatcher;
pub mod frames;
pub mod hub;
pub mod session;

pub use auth::{AuthError, TokenVerifier};
pub use authorizer::SubscriptionAuthorizer;
pub use dispatcher::RealtimeDispatcher;
pub use frames::{ClientFrame, ServerFrame};
pub use hub::{ConnectionId, SubscriptionHub};
pub use session::{GatewayServices, Session};
