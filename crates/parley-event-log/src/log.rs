//! In-memory implementation of the durable event log.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use parley_core::error::DomainError;
use parley_core::event::EventEnvelope;
use parley_core::ids::RoomId;
use parley_core::publisher::EventPublisher;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Receiving end of one partition for one consumer group.
#[derive(Debug)]
pub struct PartitionReceiver {
    partition: usize,
    rx: mpsc::UnboundedReceiver<EventEnvelope>,
}

impl PartitionReceiver {
    /// Partition index.
    #[must_use]
    pub fn partition(&self) -> usize {
        self.partition
    }

    /// Waits for the next record. Returns `None` once the log is dropped.
    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        self.rx.recv().await
    }
}

#[derive(Debug)]
struct ConsumerGroup {
    name: String,
    senders: Vec<mpsc::UnboundedSender<EventEnvelope>>,
}

/// Partitioned in-process event log.
#[derive(Debug)]
pub struct InMemoryEventLog {
    partitions: usize,
    groups: Mutex<Vec<ConsumerGroup>>,
}

impl InMemoryEventLog {
    /// Creates a log with `partitions` partitions (at least one).
    #[must_use]
    pub fn new(partitions: usize) -> Self {
        Self {
            partitions: partitions.max(1),
            groups: Mutex::new(Vec::new()),
        }
    }

    /// Number of partitions.
    #[must_use]
    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Partition that holds every record of `room_id`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn partition_for(&self, room_id: RoomId) -> usize {
        room_id.get().rem_euclid(self.partitions as i64) as usize
    }

    /// Registers a consumer group and returns one receiver per partition.
    pub fn subscribe(&self, group: &str) -> Vec<PartitionReceiver> {
        let mut senders = Vec::with_capacity(self.partitions);
        let mut receivers = Vec::with_capacity(self.partitions);
        for partition in 0..self.partitions {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.push(tx);
            receivers.push(PartitionReceiver { partition, rx });
        }

        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ConsumerGroup {
                name: group.to_owned(),
                senders,
            });
        debug!(group, partitions = self.partitions, "consumer group subscribed");

        receivers
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventLog {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        let partition = self.partition_for(event.room_id());
        let mut groups = self.groups.lock().unwrap_or_else(PoisonError::into_inner);

        groups.retain(|group| {
            let delivered = group.senders[partition].send(event.clone()).is_ok();
            if !delivered {
                debug!(group = %group.name, "consumer group closed, unsubscribing");
            }
            delivered
        });

        trace!(
            event_type = event.event_type(),
            room_id = %event.room_id(),
            partition,
            groups = groups.len(),
            "record appended"
        );
        Ok(())
    }
}
