//! Partition consumer loops.

use std::sync::Arc;

use async_trait::async_trait;
use parley_core::event::EventEnvelope;
use tokio::task::JoinHandle;
use tracing::{debug, info_span, Instrument};

use crate::log::PartitionReceiver;

/// Handles records of one consumer group.
///
/// `consume` must not fail the loop: failures are handled (logged, dropped)
/// inside the implementation.
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// Handles one record.
    async fn consume(&self, event: EventEnvelope);
}

/// Spawns one sequential loop per partition. Records of one partition are
/// handled strictly one after the other; partitions run concurrently.
pub fn spawn_partition_consumers(
    group: &'static str,
    receivers: Vec<PartitionReceiver>,
    consumer: Arc<dyn EventConsumer>,
) -> Vec<JoinHandle<()>> {
    receivers
        .into_iter()
        .map(|mut receiver| {
            let consumer = Arc::clone(&consumer);
            let partition = receiver.partition();
            tokio::spawn(
                async move {
                    while let Some(event) = receiver.recv().await {
                        consumer.consume(event).await;
                    }
                    debug!("partition closed");
                }
                .instrument(info_span!("partition_consumer", group, partition)),
            )
        })
        .collect()
}
