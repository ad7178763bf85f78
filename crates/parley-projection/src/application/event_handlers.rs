//! Event handlers for the Projection Engine.
//!
//! One handler per source event. Handlers return the derived events their
//! change produced; an empty list means the event was a no-op (typically a
//! redelivery).

use std::sync::Arc;

use async_trait::async_trait;
use parley_core::clock::Clock;
use parley_core::directory::CallPolicy;
use parley_core::event::{
    ChatEventKind, EventEnvelope, MessageSent, ReadMarkerUpdated, ReadStatusChanged, RoomCreated,
    RoomViewUpdated,
};
use parley_core::model::ReadMarker;
use parley_core::publisher::EventPublisher;
use parley_event_log::EventConsumer;
use tracing::{debug, error, info};

use crate::domain::read_model::ReadModelStore;
use crate::domain::rules;
use crate::error::ProjectionError;

/// Handles `RoomCreated`: inserts the view unless it already exists.
///
/// # Errors
///
/// Returns `ProjectionError::Store` if the read-model store fails.
pub async fn handle_room_created(
    event: &RoomCreated,
    store: &dyn ReadModelStore,
) -> Result<Vec<ChatEventKind>, ProjectionError> {
    let view = rules::view_for_new_room(event);
    if !store.insert_view_if_absent(view.clone()).await? {
        debug!(room_id = %event.room_id, "room already projected");
        return Ok(Vec::new());
    }

    info!(
        room_id = %event.room_id,
        participants = view.participant_ids.len(),
        "room projected"
    );
    Ok(vec![ChatEventKind::RoomViewUpdated(RoomViewUpdated { view })])
}

/// Handles `MessageSent`: records the message, then advances the room's view
/// if the message is newer than what it shows.
///
/// # Errors
///
/// Returns `ProjectionError::Store` if the read-model store fails.
pub async fn handle_message_sent(
    event: &MessageSent,
    store: &dyn ReadModelStore,
) -> Result<Vec<ChatEventKind>, ProjectionError> {
    let inserted = store
        .insert_message_if_absent(rules::message_record(event))
        .await?;
    if !inserted {
        debug!(message_id = %event.message_id, "message record already present");
    }

    let Some(mut view) = store.find_view(event.room_id).await? else {
        debug!(
            room_id = %event.room_id,
            message_id = %event.message_id,
            "no view for room; message recorded without view update"
        );
        return Ok(Vec::new());
    };

    if !rules::apply_message(&mut view, event) {
        return Ok(Vec::new());
    }
    store.replace_view(view.clone()).await?;
    Ok(vec![ChatEventKind::RoomViewUpdated(RoomViewUpdated { view })])
}

/// Handles `ReadMarkerUpdated`: applies the monotonic guard and, when the
/// marker moved, clears the reader's unread flag.
///
/// # Errors
///
/// Returns `ProjectionError::Store` if the read-model store fails.
pub async fn handle_read_marker_updated(
    event: &ReadMarkerUpdated,
    store: &dyn ReadModelStore,
) -> Result<Vec<ChatEventKind>, ProjectionError> {
    let marker = ReadMarker {
        room_id: event.room_id,
        customer_id: event.customer_id,
        last_read_message_id: event.last_read_message_id,
    };
    if !store.advance_read_marker(marker).await? {
        debug!(
            room_id = %event.room_id,
            customer_id = %event.customer_id,
            message_id = %event.last_read_message_id,
            "stale read marker ignored"
        );
        return Ok(Vec::new());
    }

    let Some(mut view) = store.find_view(event.room_id).await? else {
        return Ok(Vec::new());
    };
    if !rules::clear_unread(&mut view, &marker) {
        return Ok(Vec::new());
    }
    store.replace_view(view).await?;
    Ok(vec![ChatEventKind::ReadStatusChanged(ReadStatusChanged {
        room_id: event.room_id,
        customer_id: event.customer_id,
        unread: false,
    })])
}

/// Consumer-group member that keeps the read model current and feeds derived
/// events back into the log.
pub struct ProjectionEngine {
    store: Arc<dyn ReadModelStore>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    publish_policy: CallPolicy,
}

impl ProjectionEngine {
    /// Creates an engine writing to `store` and publishing derived events
    /// through `publisher`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ReadModelStore>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        publish_policy: CallPolicy,
    ) -> Self {
        Self {
            store,
            publisher,
            clock,
            publish_policy,
        }
    }

    /// Applies one event and returns the derived events it produced.
    /// Derived events themselves are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError` if the handler for the event fails.
    pub async fn apply(&self, event: &EventEnvelope) -> Result<Vec<ChatEventKind>, ProjectionError> {
        let store = self.store.as_ref();
        match &event.kind {
            ChatEventKind::RoomCreated(e) => handle_room_created(e, store).await,
            ChatEventKind::MessageSent(e) => handle_message_sent(e, store).await,
            ChatEventKind::ReadMarkerUpdated(e) => handle_read_marker_updated(e, store).await,
            ChatEventKind::RoomViewUpdated(_) | ChatEventKind::ReadStatusChanged(_) => {
                Ok(Vec::new())
            }
        }
    }

    async fn publish_derived(&self, source: &EventEnvelope, kind: ChatEventKind) {
        let derived = EventEnvelope::new(kind, source.metadata.correlation_id, self.clock.now());
        let result = self
            .publish_policy
            .run("event_log.publish", || {
                self.publisher.publish(derived.clone())
            })
            .await;
        if let Err(err) = result {
            error!(
                publish_drift = true,
                event_type = derived.event_type(),
                room_id = %derived.room_id(),
                source_event_id = %source.metadata.event_id,
                error = %err,
                "derived event not published"
            );
        }
    }
}

#[async_trait]
impl EventConsumer for ProjectionEngine {
    async fn consume(&self, event: EventEnvelope) {
        match self.apply(&event).await {
            Ok(derived) => {
                for kind in derived {
                    self.publish_derived(&event, kind).await;
                }
            }
            Err(err) => error!(
                event_id = %event.metadata.event_id,
                event_type = event.event_type(),
                room_id = %event.room_id(),
                error = %err,
                "projection failed; event dropped"
            ),
        }
    }
}
