// src/logging.rs
//
// Event sinks for scheduler telemetry.
// - EventSink:  trait used by the scheduler
// - NoopSink:   discards all events
// - MemorySink: keeps every record in memory (tests, replay)
//
// The env-configured JSONL/stdout sink lives in `telemetry.rs`.

use serde_json::Value as JsonValue;

/// Abstract sink for structured telemetry records.
///
/// Implementations must never fail loudly: a broken sink has no influence on
/// scheduling decisions.
pub trait EventSink {
    fn log_json(&mut self, record: &JsonValue);

    fn flush(&mut self) {}
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn log_json(&mut self, _record: &JsonValue) {
        // intentionally no-op
    }
}

/// Sink that stores every record, in emission order.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Vec<JsonValue>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[JsonValue] {
        &self.records
    }

    pub fn take(&mut self) -> Vec<JsonValue> {
        std::mem::take(&mut self.records)
    }
}

impl EventSink for MemorySink {
    fn log_json(&mut self, record: &JsonValue) {
        self.records.push(record.clone());
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn log_json(&mut self, record: &JsonValue) {
        (**self).log_json(record);
    }

    fn flush(&mut self) {
        (**self).flush();
    }
}
