//! Command handlers for the Command Processor.
//!
//! Every handler follows the same shape: validate, check membership, resolve
//! collaborator data, persist, then publish exactly one event keyed by the
//! room. Collaborator lookups happen before the write so a failed lookup
//! leaves nothing behind.

use parley_core::clock::Clock;
use parley_core::directory::{CallPolicy, IdentityDirectory};
use parley_core::error::DomainError;
use parley_core::event::{
    ChatEventKind, EventEnvelope, MessageSent, ReadMarkerUpdated, RoomCreated,
};
use parley_core::ids::{RoomId, UserId};
use parley_core::publisher::EventPublisher;
use parley_core::repository::{ChatRepository, NewMessage, NewRoom};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::domain::commands::{CreateRoom, SubmitMessage, UpdateReadMarker};
use crate::domain::events;

/// Collaborators shared by all command handlers.
#[derive(Clone, Copy)]
pub struct CommandContext<'a> {
    pub clock: &'a dyn Clock,
    pub repo: &'a dyn ChatRepository,
    pub identity: &'a dyn IdentityDirectory,
    pub publisher: &'a dyn EventPublisher,
    /// Applied to identity lookups.
    pub collaborator_policy: CallPolicy,
    /// Applied to event-log publishes.
    pub publish_policy: CallPolicy,
}

/// Handles `SubmitMessage`: persists the message and publishes `MessageSent`.
///
/// # Errors
///
/// Returns `DomainError::Validation` for empty content or an unknown room,
/// `DomainError::Forbidden` when the sender is not a participant,
/// `DomainError::Dependency` when the sender's display name cannot be
/// resolved, and `DomainError::Infrastructure` when the write store fails.
pub async fn handle_submit_message(
    command: &SubmitMessage,
    ctx: &CommandContext<'_>,
) -> Result<MessageSent, DomainError> {
    if command.content.trim().is_empty() {
        return Err(DomainError::Validation("content cannot be empty".into()));
    }
    ensure_room_exists(ctx, command.room_id).await?;
    ensure_participant(ctx, command.room_id, command.sender_id).await?;

    let sender_display_name = resolve_display_name(ctx, command.sender_id).await?;

    let stored = ctx
        .repo
        .insert_message(NewMessage {
            room_id: command.room_id,
            sender_id: command.sender_id,
            content: command.content.clone(),
            sent_at: ctx.clock.now(),
        })
        .await?;
    info!(
        room_id = %stored.room_id,
        message_id = %stored.message_id,
        sender_id = %stored.sender_id,
        "message persisted"
    );

    let sent = events::message_sent(stored, sender_display_name);
    publish(
        ctx,
        ChatEventKind::MessageSent(sent.clone()),
        command.correlation_id,
    )
    .await;
    Ok(sent)
}

/// Handles `CreateRoom`: persists the room with its participants and
/// publishes `RoomCreated`.
///
/// # Errors
///
/// Returns `DomainError::Validation` for an empty name,
/// `DomainError::Dependency` when any
/// participant's display name cannot be resolved, and
/// `DomainError::Infrastructure` when the write store fails.
pub async fn handle_create_room(
    command: &CreateRoom,
    ctx: &CommandContext<'_>,
) -> Result<RoomCreated, DomainError> {
    if command.room_name.trim().is_empty() {
        return Err(DomainError::Validation("roomName cannot be empty".into()));
    }
    let participant_ids = command.participant_ids();

    let mut participants = Vec::with_capacity(participant_ids.len());
    for id in &participant_ids {
        participants.push((*id, resolve_display_name(ctx, *id).await?));
    }

    let created_at = ctx.clock.now();
    let room_id = ctx
        .repo
        .insert_room(NewRoom {
            room_name: command.room_name.clone(),
            created_by: command.creator_id,
            created_at,
            participant_ids,
        })
        .await?;
    info!(
        room_id = %room_id,
        created_by = %command.creator_id,
        participants = participants.len(),
        "room persisted"
    );

    let created = events::room_created(command, room_id, created_at, participants);
    publish(
        ctx,
        ChatEventKind::RoomCreated(created.clone()),
        command.correlation_id,
    )
    .await;
    Ok(created)
}

/// Handles `UpdateReadMarker`: applies the monotonic write and publishes
/// `ReadMarkerUpdated` whether or not the stored value moved.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` when the customer is not a participant
/// and `DomainError::Infrastructure` when the write store fails.
pub async fn handle_update_read_marker(
    command: &UpdateReadMarker,
    ctx: &CommandContext<'_>,
) -> Result<ReadMarkerUpdated, DomainError> {
    ensure_participant(ctx, command.room_id, command.customer_id).await?;

    let advanced = ctx
        .repo
        .update_read_marker(command.room_id, command.customer_id, command.message_id)
        .await?;
    debug!(
        room_id = %command.room_id,
        customer_id = %command.customer_id,
        message_id = %command.message_id,
        advanced,
        "read marker written"
    );

    let updated = events::read_marker_updated(command);
    publish(
        ctx,
        ChatEventKind::ReadMarkerUpdated(updated),
        command.correlation_id,
    )
    .await;
    Ok(updated)
}

async fn ensure_room_exists(ctx: &CommandContext<'_>, room_id: RoomId) -> Result<(), DomainError> {
    if ctx.repo.room_exists(room_id).await? {
        Ok(())
    } else {
        Err(DomainError::Validation(format!("room {room_id} does not exist")))
    }
}

async fn ensure_participant(
    ctx: &CommandContext<'_>,
    room_id: RoomId,
    user_id: UserId,
) -> Result<(), DomainError> {
    if ctx.repo.is_participant(room_id, user_id).await? {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!(
            "customer {user_id} is not a participant of room {room_id}"
        )))
    }
}

/// Any lookup failure, including an unknown user, is reported as a
/// dependency failure.
async fn resolve_display_name(
    ctx: &CommandContext<'_>,
    user_id: UserId,
) -> Result<String, DomainError> {
    ctx.collaborator_policy
        .run("identity.display_name", || ctx.identity.display_name(user_id))
        .await
        .map_err(|err| match err {
            DomainError::Dependency(_) => err,
            other => DomainError::Dependency(format!(
                "display name for customer {user_id} unavailable: {other}"
            )),
        })
}

/// Publishes after the write has committed. A publish that still fails after
/// the bounded retries is logged as drift; the write itself stands.
async fn publish(ctx: &CommandContext<'_>, kind: ChatEventKind, correlation_id: Uuid) {
    let envelope = EventEnvelope::new(kind, correlation_id, ctx.clock.now());
    let result = ctx
        .publish_policy
        .run("event_log.publish", || ctx.publisher.publish(envelope.clone()))
        .await;

    match result {
        Ok(()) => debug!(
            event_type = envelope.event_type(),
            event_id = %envelope.metadata.event_id,
            room_id = %envelope.room_id(),
            "event published"
        ),
        Err(err) => error!(
            publish_drift = true,
            event_type = envelope.event_type(),
            event_id = %envelope.metadata.event_id,
            room_id = %envelope.room_id(),
            %correlation_id,
            error = %err,
            "write persisted but event was not published"
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use parley_core::clock::Clock;
    use parley_core::directory::{CallPolicy, IdentityDirectory};
    use parley_core::error::DomainError;
    use parley_core::event::ChatEventKind;
    use parley_core::ids::{MessageId, RoomId, UserId};
    use parley_core::publisher::EventPublisher;
    use parley_core::repository::{ChatRepository, NewRoom};
    use parley_store::memory_chat_repository::InMemoryChatRepository;
    use parley_test_support::{
        FailingEventPublisher, FailingIdentityDirectory, FixedClock, RecordingEventPublisher,
        StaticIdentityDirectory,
    };
    use uuid::Uuid;

    use super::{
        CommandContext, handle_create_room, handle_submit_message, handle_update_read_marker,
    };
    use crate::domain::commands::{CreateRoom, SubmitMessage, UpdateReadMarker};

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn names() -> StaticIdentityDirectory {
        StaticIdentityDirectory::new([(1, "Alice"), (2, "Bob"), (3, "Carol")])
    }

    fn fast_policy() -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_millis(50),
            attempts: 3,
            backoff: Duration::from_millis(10),
        }
    }

    fn context<'a>(
        clock: &'a dyn Clock,
        repo: &'a dyn ChatRepository,
        identity: &'a dyn IdentityDirectory,
        publisher: &'a dyn EventPublisher,
    ) -> CommandContext<'a> {
        CommandContext {
            clock,
            repo,
            identity,
            publisher,
            collaborator_policy: fast_policy(),
            publish_policy: fast_policy(),
        }
    }

    async fn repo_with_team_room() -> InMemoryChatRepository {
        let repo = InMemoryChatRepository::with_sequences(100, 1000);
        repo.insert_room(NewRoom {
            room_name: "Team".to_owned(),
            created_by: UserId(1),
            created_at: fixed_clock().now(),
            participant_ids: vec![UserId(1), UserId(2), UserId(3)],
        })
        .await
        .unwrap();
        repo
    }

    fn submit(room_id: i64, sender_id: i64, content: &str) -> SubmitMessage {
        SubmitMessage {
            correlation_id: Uuid::new_v4(),
            room_id: RoomId(room_id),
            sender_id: UserId(sender_id),
            content: content.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_submit_message_persists_and_publishes_message_sent() {
        // Arrange
        let clock = fixed_clock();
        let repo = repo_with_team_room().await;
        let identity = names();
        let publisher = RecordingEventPublisher::new();
        let ctx = context(&clock, &repo, &identity, &publisher);
        let command = submit(100, 1, "hi");

        // Act
        let sent = handle_submit_message(&command, &ctx).await.unwrap();

        // Assert
        assert_eq!(sent.message_id, MessageId(1000));
        assert_eq!(sent.sender_display_name, "Alice");
        assert_eq!(sent.sent_at, clock.0);
        assert_eq!(repo.messages().len(), 1);

        let published = publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type(), "chat.message_sent");
        assert_eq!(published[0].room_id(), RoomId(100));
        assert_eq!(published[0].metadata.correlation_id, command.correlation_id);
        assert_eq!(published[0].kind, ChatEventKind::MessageSent(sent));
    }

    #[tokio::test]
    async fn test_submit_message_rejects_empty_content() {
        let clock = fixed_clock();
        let repo = repo_with_team_room().await;
        let identity = names();
        let publisher = RecordingEventPublisher::new();
        let ctx = context(&clock, &repo, &identity, &publisher);

        let result = handle_submit_message(&submit(100, 1, "   "), &ctx).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(repo.messages().is_empty());
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_submit_message_rejects_unknown_room() {
        let clock = fixed_clock();
        let repo = repo_with_team_room().await;
        let identity = names();
        let publisher = RecordingEventPublisher::new();
        let ctx = context(&clock, &repo, &identity, &publisher);

        let result = handle_submit_message(&submit(999, 1, "hi"), &ctx).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_submit_message_rejects_non_participant() {
        let clock = fixed_clock();
        let repo = repo_with_team_room().await;
        let identity = names();
        let publisher = RecordingEventPublisher::new();
        let ctx = context(&clock, &repo, &identity, &publisher);

        let result = handle_submit_message(&submit(100, 42, "hi"), &ctx).await;

        assert!(matches!(result, Err(DomainError::Forbidden(_))));
        assert!(repo.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_message_leaves_no_trace_when_identity_lookup_fails() {
        // Arrange
        let clock = fixed_clock();
        let repo = repo_with_team_room().await;
        let identity = FailingIdentityDirectory;
        let publisher = RecordingEventPublisher::new();
        let ctx = context(&clock, &repo, &identity, &publisher);

        // Act
        let result = handle_submit_message(&submit(100, 1, "hi"), &ctx).await;

        // Assert
        let err = result.unwrap_err();
        assert!(matches!(err, DomainError::Dependency(_)));
        assert!(err.is_retryable());
        assert!(repo.messages().is_empty());
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_submit_message_reports_unknown_sender_name_as_dependency_failure() {
        let clock = fixed_clock();
        let repo = repo_with_team_room().await;
        let identity = StaticIdentityDirectory::new([(2, "Bob")]);
        let publisher = RecordingEventPublisher::new();
        let ctx = context(&clock, &repo, &identity, &publisher);

        let result = handle_submit_message(&submit(100, 1, "hi"), &ctx).await;

        assert!(matches!(result, Err(DomainError::Dependency(_))));
        assert!(repo.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_message_succeeds_when_publish_keeps_failing() {
        // Arrange
        let clock = fixed_clock();
        let repo = repo_with_team_room().await;
        let identity = names();
        let publisher = FailingEventPublisher::new();
        let ctx = context(&clock, &repo, &identity, &publisher);

        // Act
        let result = handle_submit_message(&submit(100, 1, "hi"), &ctx).await;

        // Assert
        assert!(result.is_ok());
        assert_eq!(repo.messages().len(), 1);
        assert_eq!(publisher.attempts(), 3);
    }

    #[tokio::test]
    async fn test_create_room_persists_participants_and_publishes_room_created() {
        // Arrange
        let clock = fixed_clock();
        let repo = InMemoryChatRepository::with_sequences(100, 1000);
        let identity = names();
        let publisher = RecordingEventPublisher::new();
        let ctx = context(&clock, &repo, &identity, &publisher);
        let command = CreateRoom {
            correlation_id: Uuid::new_v4(),
            room_name: "Team".to_owned(),
            creator_id: UserId(1),
            target_ids: vec![UserId(2), UserId(3), UserId(2)],
        };

        // Act
        let created = handle_create_room(&command, &ctx).await.unwrap();

        // Assert
        assert_eq!(created.room_id, RoomId(100));
        assert_eq!(created.created_by, UserId(1));
        let described: Vec<(UserId, &str)> = created
            .participants
            .iter()
            .map(|p| (p.id, p.display_name.as_str()))
            .collect();
        assert_eq!(
            described,
            vec![(UserId(1), "Alice"), (UserId(2), "Bob"), (UserId(3), "Carol")]
        );
        assert!(created.participants.iter().all(|p| p.joined_at == clock.0));
        assert_eq!(
            repo.participants(RoomId(100)),
            vec![UserId(1), UserId(2), UserId(3)]
        );

        let published = publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type(), "chat.room_created");
        assert_eq!(published[0].room_id(), RoomId(100));
    }

    #[tokio::test]
    async fn test_create_room_with_only_the_creator_has_one_participant() {
        // Arrange
        let clock = fixed_clock();
        let repo = InMemoryChatRepository::with_sequences(100, 1000);
        let identity = names();
        let publisher = RecordingEventPublisher::new();
        let ctx = context(&clock, &repo, &identity, &publisher);
        let command = CreateRoom {
            correlation_id: Uuid::new_v4(),
            room_name: "Notes".to_owned(),
            creator_id: UserId(1),
            target_ids: vec![UserId(1)],
        };

        // Act
        let created = handle_create_room(&command, &ctx).await.unwrap();

        // Assert
        let ids: Vec<UserId> = created.participants.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![UserId(1)]);
        assert_eq!(repo.participants(RoomId(100)), vec![UserId(1)]);
        assert_eq!(publisher.published().len(), 1);
    }


    #[tokio::test]
    async fn test_create_room_rejects_empty_name() {
        let clock = fixed_clock();
        let repo = InMemoryChatRepository::new();
        let identity = names();
        let publisher = RecordingEventPublisher::new();
        let ctx = context(&clock, &repo, &identity, &publisher);
        let command = CreateRoom {
            correlation_id: Uuid::new_v4(),
            room_name: String::new(),
            creator_id: UserId(1),
            target_ids: vec![UserId(2)],
        };

        let result = handle_create_room(&command, &ctx).await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_room_persists_nothing_when_a_name_is_missing() {
        let clock = fixed_clock();
        let repo = InMemoryChatRepository::with_sequences(100, 1000);
        let identity = StaticIdentityDirectory::new([(1, "Alice")]);
        let publisher = RecordingEventPublisher::new();
        let ctx = context(&clock, &repo, &identity, &publisher);
        let command = CreateRoom {
            correlation_id: Uuid::new_v4(),
            room_name: "Team".to_owned(),
            creator_id: UserId(1),
            target_ids: vec![UserId(2)],
        };

        let result = handle_create_room(&command, &ctx).await;

        assert!(matches!(result, Err(DomainError::Dependency(_))));
        assert!(repo.room(RoomId(100)).is_none());
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_update_read_marker_publishes_even_when_guard_rejects() {
        // Arrange
        let clock = fixed_clock();
        let repo = repo_with_team_room().await;
        let identity = names();
        let publisher = RecordingEventPublisher::new();
        let ctx = context(&clock, &repo, &identity, &publisher);
        let marker = |message_id| UpdateReadMarker {
            correlation_id: Uuid::new_v4(),
            room_id: RoomId(100),
            customer_id: UserId(2),
            message_id: MessageId(message_id),
        };

        // Act
        handle_update_read_marker(&marker(1005), &ctx).await.unwrap();
        let stale = handle_update_read_marker(&marker(1001), &ctx).await.unwrap();

        // Assert
        assert_eq!(stale.last_read_message_id, MessageId(1001));
        assert_eq!(
            repo.last_read_message_id(RoomId(100), UserId(2)),
            Some(MessageId(1005))
        );
        let published = publisher.published();
        assert_eq!(published.len(), 2);
        assert!(
            published
                .iter()
                .all(|e| e.event_type() == "chat.read_marker_updated")
        );
    }

    #[tokio::test]
    async fn test_update_read_marker_rejects_non_participant() {
        let clock = fixed_clock();
        let repo = repo_with_team_room().await;
        let identity = names();
        let publisher = RecordingEventPublisher::new();
        let ctx = context(&clock, &repo, &identity, &publisher);
        let command = UpdateReadMarker {
            correlation_id: Uuid::new_v4(),
            room_id: RoomId(100),
            customer_id: UserId(42),
            message_id: MessageId(1000),
        };

        let result = handle_update_read_marker(&command, &ctx).await;

        assert!(matches!(result, Err(DomainError::Forbidden(_))));
        assert!(publisher.published().is_empty());
    }
}
