//! Test sink — records real-time deliveries instead of pushing them.

use std::sync::Mutex;

use parley_core::realtime::{Destination, RealtimePayload, RealtimeSink};

/// A sink that records every `(destination, payload)` pair it is handed and
/// reports a single accepting connection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<(Destination, RealtimePayload)>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every delivery.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn deliveries(&self) -> Vec<(Destination, RealtimePayload)> {
        self.deliveries.lock().unwrap().clone()
    }

    /// Returns the payloads delivered to one destination.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn delivered_to(&self, destination: &Destination) -> Vec<RealtimePayload> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .filter(|(dest, _)| dest == destination)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

impl RealtimeSink for RecordingSink {
    fn deliver(&self, destination: &Destination, payload: &RealtimePayload) -> usize {
        self.deliveries
            .lock()
            .unwrap()
            .push((destination.clone(), payload.clone()));
        1
    }
}
