//! Event-log consumer that turns chat events into real-time deliveries.

use std::sync::Arc;

use async_trait::async_trait;
use parley_core::event::{ChatEventKind, EventEnvelope};
use parley_core::realtime::{Destination, RealtimePayload, RealtimeSink};
use parley_event_log::EventConsumer;
use tracing::debug;

/// Where each event kind is delivered. Personal updates go to the private
/// stream of the affected user only.
#[must_use]
pub fn routes(kind: &ChatEventKind) -> Vec<(Destination, RealtimePayload)> {
    match kind {
        ChatEventKind::MessageSent(e) => vec![(
            Destination::RoomMessages(e.room_id),
            RealtimePayload::Message(e.clone()),
        )],
        ChatEventKind::ReadMarkerUpdated(e) => vec![(
            Destination::RoomReadMarkers(e.room_id),
            RealtimePayload::ReadMarker(*e),
        )],
        ChatEventKind::RoomViewUpdated(e) => e
            .view
            .participant_ids
            .iter()
            .map(|user_id| {
                (
                    Destination::UserRooms(*user_id),
                    RealtimePayload::RoomView(e.view.clone()),
                )
            })
            .collect(),
        ChatEventKind::ReadStatusChanged(e) => vec![(
            Destination::UserReadStatus(e.customer_id),
            RealtimePayload::ReadStatus(*e),
        )],
        ChatEventKind::RoomCreated(_) => Vec::new(),
    }
}

/// Pushes every routed event to the sink.
pub struct RealtimeDispatcher {
    sink: Arc<dyn RealtimeSink>,
}

impl RealtimeDispatcher {
    #[must_use]
    pub fn new(sink: Arc<dyn RealtimeSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl EventConsumer for RealtimeDispatcher {
    async fn consume(&self, event: EventEnvelope) {
        for (destination, payload) in routes(&event.kind) {
            let delivered = self.sink.deliver(&destination, &payload);
            debug!(
                event_type = event.event_type(),
                destination = %destination,
                delivered,
                "event fanned out"
            );
        }
    }
}
