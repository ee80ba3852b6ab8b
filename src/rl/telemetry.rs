// src/rl/telemetry.rs
//
// Scheduler-specific telemetry records.
//
// Every record carries the local entity's short address as `id`:
// - {id, slots: [...]}                              observation vector
// - {id, action: <index>}                           raw chosen global action
// - {id, action: "alloc"|"dealloc", slot, superframe}  resolved decision
// - {id, anomaly: <kind>, ...}                      policy/table anomalies
//
// Records are advisory. Nothing here may influence a scheduling decision.

use serde_json::{json, Value as JsonValue};

use super::observation::SlotObservation;
use crate::logging::EventSink;
use crate::types::{ActionIndex, ShortAddress, SlotCoordinate};

pub const ANOMALY_DECODE_OUT_OF_RANGE: &str = "decode_out_of_range";
pub const ANOMALY_RECORD_OUT_OF_RANGE: &str = "record_out_of_range";

/// Kind of resolved decision, as written to telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionKind {
    Alloc,
    Dealloc,
}

impl DecisionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionKind::Alloc => "alloc",
            DecisionKind::Dealloc => "dealloc",
        }
    }
}

pub fn state_record(id: ShortAddress, obs: &SlotObservation) -> JsonValue {
    json!({ "id": id, "slots": obs.slots })
}

pub fn action_record(id: ShortAddress, action: ActionIndex) -> JsonValue {
    json!({ "id": id, "action": action })
}

pub fn decision_record(id: ShortAddress, kind: DecisionKind, coord: SlotCoordinate) -> JsonValue {
    json!({
        "id": id,
        "action": kind.as_str(),
        "slot": coord.slot_id,
        "superframe": coord.superframe_id,
    })
}

pub fn decode_anomaly_record(id: ShortAddress, action: ActionIndex, n: usize) -> JsonValue {
    json!({
        "id": id,
        "anomaly": ANOMALY_DECODE_OUT_OF_RANGE,
        "action": action,
        "address_space": n,
    })
}

pub fn record_anomaly_record(id: ShortAddress, coord: SlotCoordinate) -> JsonValue {
    json!({
        "id": id,
        "anomaly": ANOMALY_RECORD_OUT_OF_RANGE,
        "slot": coord.slot_id,
        "superframe": coord.superframe_id,
    })
}

/// Telemetry front-end owned by the scheduler.
pub struct SchedulerTelemetry<S: EventSink> {
    id: ShortAddress,
    sink: S,
}

impl<S: EventSink> SchedulerTelemetry<S> {
    pub fn new(id: ShortAddress, sink: S) -> Self {
        Self { id, sink }
    }

    pub fn id(&self) -> ShortAddress {
        self.id
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Log the observation, plus one anomaly per table record that did not
    /// fit the topology.
    pub fn log_state(&mut self, obs: &SlotObservation) {
        self.sink.log_json(&state_record(self.id, obs));
        for &coord in &obs.out_of_range {
            self.sink.log_json(&record_anomaly_record(self.id, coord));
        }
    }

    pub fn log_action(&mut self, action: ActionIndex) {
        self.sink.log_json(&action_record(self.id, action));
    }

    pub fn log_decision(&mut self, kind: DecisionKind, coord: SlotCoordinate) {
        self.sink.log_json(&decision_record(self.id, kind, coord));
    }

    pub fn log_decode_anomaly(&mut self, action: ActionIndex, n: usize) {
        self.sink.log_json(&decode_anomaly_record(self.id, action, n));
    }

    pub fn flush(&mut self) {
        self.sink.flush();
    }
}
