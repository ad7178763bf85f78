//! Shared test mocks and utilities for the Parley real-time chat platform.

mod clock;
mod directory;
mod keys;
mod publisher;
mod sink;

pub use clock::FixedClock;
pub use directory::{
    FailingIdentityDirectory, FailingMembershipDirectory, StaticIdentityDirectory,
    StaticMembershipDirectory,
};
pub use keys::{FAR_FUTURE_EXP, TEST_PRIVATE_KEY_PEM, TEST_PUBLIC_KEY_PEM, sign_claims, sign_token};
pub use publisher::{FailingEventPublisher, RecordingEventPublisher};
pub use sink::RecordingSink;
