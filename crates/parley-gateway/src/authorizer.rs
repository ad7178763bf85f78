//! Subscription authorization.

use std::sync::Arc;

use parley_core::directory::{CallPolicy, MembershipDirectory};
use parley_core::error::DomainError;
use parley_core::ids::UserId;
use parley_core::realtime::Destination;
use tracing::warn;

/// Decides whether a user may subscribe to a destination.
///
/// Room-scoped destinations require room membership; everything else is
/// open. A membership lookup that fails after the policy's retries denies.
pub struct SubscriptionAuthorizer {
    membership: Arc<dyn MembershipDirectory>,
    policy: CallPolicy,
}

impl SubscriptionAuthorizer {
    #[must_use]
    pub fn new(membership: Arc<dyn MembershipDirectory>, policy: CallPolicy) -> Self {
        Self { membership, policy }
    }

    /// # Errors
    ///
    /// Returns `DomainError::Forbidden` when the user is not a member of the
    /// destination's room, or `DomainError::Dependency` when membership could
    /// not be determined.
    pub async fn authorize(
        &self,
        user_id: UserId,
        destination: &Destination,
    ) -> Result<(), DomainError> {
        let Some(room_id) = destination.room_id() else {
            return Ok(());
        };

        let member = self
            .policy
            .run("membership.is_room_member", || {
                self.membership.is_room_member(room_id, user_id)
            })
            .await?;
        if member {
            Ok(())
        } else {
            warn!(user_id = %user_id, destination = %destination, "subscription denied");
            Err(DomainError::Forbidden(format!(
                "customer {user_id} is not a member of room {room_id}"
            )))
        }
    }
}
