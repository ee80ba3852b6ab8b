//! GTS scheduler core library.
//!
//! Picks, once per multi-superframe cycle, a single Guaranteed Time Slot
//! management action for a DSME MAC entity: allocate one TX slot, release
//! one, or do nothing. The choice comes from a pluggable scoring policy;
//! this crate owns everything around it. The binary (`src/main.rs`) is a
//! thin harness around these components.
//!
//! # Architecture
//!
//! - **Topology** (`topology`): per-superframe GTS capacity and
//!   multi-superframe length, read fresh every cycle.
//! - **Allocation table** (`allocation`): active slots per peer and
//!   direction, owned by the MAC layer.
//! - **Slot address space** (`rl::address_map`): bijection between
//!   `(slot, superframe)` and a flat action index.
//! - **Observation** (`rl::observation`): the table rendered as +1 (TX),
//!   -1 (RX), 0 (free) over the flat space.
//! - **Scheduler** (`rl::scheduler`): invokes the policy, keeps the
//!   current/previous action and resolves the action into a decision with
//!   the repeat-escalation and TX retention rules.
//! - **Telemetry** (`logging`, `telemetry`, `rl::telemetry`): best-effort
//!   JSON records that never affect control flow.

pub mod allocation;
pub mod config;
pub mod error;
pub mod logging;
pub mod rl;
pub mod telemetry;
pub mod topology;
pub mod types;

// --- Re-exports for ergonomic external use ---------------------------------

pub use allocation::{AllocationTable, InMemoryAllocationTable};

pub use config::{CapacityModel, DeallocTarget, SchedulerConfig, TopologyConfig};

pub use error::{ConfigError, PolicyError, SchedulerError};

pub use logging::{EventSink, MemorySink, NoopSink};

pub use telemetry::{TelemetryConfig, TelemetryMode, TelemetrySink};

pub use topology::{DsmeTopology, StaticTopology, TopologyProvider};

pub use types::{
    ActionIndex, AllocationRecord, Direction, GtsRequest, SchedulingDecision, ShortAddress,
    SlotCoordinate, BROADCAST_ADDRESS, NO_SHORT_ADDRESS,
};

pub use rl::{
    block_superframe, classify, select_action, ActionClass, ActionHistory, DensePolicy,
    NoopPolicy, Policy, RlScheduler, SlotAddressMapper, SlotObservation,
};
