//! Parley event log — ordered, partitioned publish/subscribe.
//!
//! Records are routed to a partition by room id, so every consumer observes
//! the records of one room in production order. Nothing is ordered across
//! partitions. Each consumer group receives its own copy of every record
//! published after it subscribed.

pub mod consumer;
pub mod log;

pub use consumer::{EventConsumer, spawn_partition_consumers};
pub use log::{InMemoryEventLog, PartitionReceiver};
