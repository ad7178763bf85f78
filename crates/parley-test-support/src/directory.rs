//! Test directories — mock collaborator implementations for tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use parley_core::directory::{IdentityDirectory, MembershipDirectory};
use parley_core::error::DomainError;
use parley_core::ids::{RoomId, UserId};

/// An identity directory backed by a fixed name table. Unknown users yield
/// `DomainError::NotFound`.
#[derive(Debug, Default)]
pub struct StaticIdentityDirectory {
    names: HashMap<UserId, String>,
}

impl StaticIdentityDirectory {
    /// Create a directory from `(user id, display name)` pairs.
    #[must_use]
    pub fn new<'a>(entries: impl IntoIterator<Item = (i64, &'a str)>) -> Self {
        Self {
            names: entries
                .into_iter()
                .map(|(id, name)| (UserId(id), name.to_owned()))
                .collect(),
        }
    }
}

#[async_trait]
impl IdentityDirectory for StaticIdentityDirectory {
    async fn display_name(&self, user_id: UserId) -> Result<String, DomainError> {
        self.names
            .get(&user_id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("customer {user_id}")))
    }
}

/// An identity directory whose backing service is always unreachable.
#[derive(Debug)]
pub struct FailingIdentityDirectory;

#[async_trait]
impl IdentityDirectory for FailingIdentityDirectory {
    async fn display_name(&self, _user_id: UserId) -> Result<String, DomainError> {
        Err(DomainError::Dependency("identity service unreachable".into()))
    }
}

/// A membership directory whose table can be changed while a test runs.
#[derive(Debug, Default)]
pub struct StaticMembershipDirectory {
    rooms: Mutex<HashMap<RoomId, BTreeSet<UserId>>>,
}

impl StaticMembershipDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory with one room and its members.
    #[must_use]
    pub fn with_room(room_id: i64, members: &[i64]) -> Self {
        let directory = Self::new();
        for member in members {
            directory.add_member(room_id, *member);
        }
        directory
    }

    /// Adds `user_id` to `room_id`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn add_member(&self, room_id: i64, user_id: i64) {
        self.rooms
            .lock()
            .unwrap()
            .entry(RoomId(room_id))
            .or_default()
            .insert(UserId(user_id));
    }
}

#[async_trait]
impl MembershipDirectory for StaticMembershipDirectory {
    async fn is_room_member(&self, room_id: RoomId, user_id: UserId) -> Result<bool, DomainError> {
        Ok(self
            .rooms
            .lock()
            .unwrap()
            .get(&room_id)
            .is_some_and(|members| members.contains(&user_id)))
    }

    async fn rooms_for_user(&self, user_id: UserId) -> Result<Vec<RoomId>, DomainError> {
        let mut rooms: Vec<RoomId> = self
            .rooms
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, members)| members.contains(&user_id))
            .map(|(room, _)| *room)
            .collect();
        rooms.sort();
        Ok(rooms)
    }
}

/// A membership directory whose backing service is always unreachable.
#[derive(Debug)]
pub struct FailingMembershipDirectory;

#[async_trait]
impl MembershipDirectory for FailingMembershipDirectory {
    async fn is_room_member(&self, _room_id: RoomId, _user_id: UserId) -> Result<bool, DomainError> {
        Err(DomainError::Dependency("membership service unreachable".into()))
    }

    async fn rooms_for_user(&self, _user_id: UserId) -> Result<Vec<RoomId>, DomainError> {
        Err(DomainError::Dependency("membership service unreachable".into()))
    }
}
