//! Membership answers served from the projected conversation views.

use std::sync::Arc;

use async_trait::async_trait;
use parley_core::directory::MembershipDirectory;
use parley_core::error::DomainError;
use parley_core::ids::{RoomId, UserId};

use crate::application::query_handlers;
use crate::domain::read_model::ReadModelStore;

/// `MembershipDirectory` backed by the read model.
#[derive(Clone)]
pub struct ReadModelDirectory {
    store: Arc<dyn ReadModelStore>,
}

impl ReadModelDirectory {
    #[must_use]
    pub fn new(store: Arc<dyn ReadModelStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MembershipDirectory for ReadModelDirectory {
    async fn is_room_member(&self, room_id: RoomId, user_id: UserId) -> Result<bool, DomainError> {
        query_handlers::is_room_member(room_id, user_id, self.store.as_ref()).await
    }

    async fn rooms_for_user(&self, user_id: UserId) -> Result<Vec<RoomId>, DomainError> {
        let views = query_handlers::get_rooms_for_user(user_id, self.store.as_ref()).await?;
        Ok(views.into_iter().map(|view| view.room_id).collect())
    }
}
