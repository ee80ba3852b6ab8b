// src/rl/mod.rs
//
// Learned-policy GTS scheduling.
//
// Key components:
// - SlotAddressMapper: (slot, superframe) <-> flat action index
// - SlotObservation: allocation table rendered into the flat space
// - Policy: opaque scoring function over the observation
// - RlScheduler: policy invocation, action history and decision resolution
// - SchedulerTelemetry: structured records of state, action and decision
//
// Design principle: "policy proposes, scheduler validates"

pub mod address_map;
pub mod observation;
pub mod policy;
pub mod scheduler;
pub mod telemetry;

// Re-exports for convenience
pub use address_map::{block_superframe, SlotAddressMapper, BLOCKED};
pub use observation::SlotObservation;
pub use policy::{
    select_action, Activation, DenseLayer, DensePolicy, DenseWeights, NoopPolicy, Policy,
    NOOP_POLICY_VERSION,
};
pub use scheduler::{classify, escalate, ActionClass, ActionHistory, RlScheduler};
pub use telemetry::{DecisionKind, SchedulerTelemetry};
