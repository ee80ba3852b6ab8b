// src/rl/scheduler.rs
//
// Policy-driven GTS scheduler.
//
// One call to `get_next_scheduling_action` is one scheduling cycle:
//
//   topology -> observation -> telemetry(state) -> policy -> argmax
//            -> classify -> allocate / deallocate / no-op -> telemetry(decision)
//
// The only state that survives between cycles is the two-entry action
// history. Cycles are run-to-completion and must be serialized by the
// caller.

use super::address_map::SlotAddressMapper;
use super::observation::SlotObservation;
use super::policy::{select_action, Policy};
use super::telemetry::{DecisionKind, SchedulerTelemetry};
use crate::allocation::AllocationTable;
use crate::config::{DeallocTarget, SchedulerConfig};
use crate::error::SchedulerError;
use crate::logging::{EventSink, NoopSink};
use crate::topology::TopologyProvider;
use crate::types::{
    ActionIndex, Direction, GtsRequest, SchedulingDecision, ShortAddress, SlotCoordinate,
    NO_SHORT_ADDRESS,
};

/// Current and previous global action index.
///
/// Both start at 0. `previous` takes the old `current` right before the
/// policy is asked for a new one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionHistory {
    pub current: ActionIndex,
    pub previous: ActionIndex,
}

impl ActionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift `current` into `previous` ahead of a new decision.
    pub fn advance(&mut self) {
        self.previous = self.current;
    }

    pub fn record(&mut self, action: ActionIndex) {
        self.current = action;
    }

    /// The policy chose exactly the same global action as last cycle.
    pub fn is_repeat(&self) -> bool {
        self.current == self.previous
    }
}

/// Meaning of a global action index for an address space of size N.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionClass {
    /// `action < N`; carries the flat slot index.
    Allocate(ActionIndex),
    /// `N <= action < 2N`; carries `action - N`.
    Deallocate(ActionIndex),
    /// `action >= 2N`.
    NoOp,
}

pub fn classify(action: ActionIndex, n: usize) -> ActionClass {
    if action < n {
        ActionClass::Allocate(action)
    } else if action < 2 * n {
        ActionClass::Deallocate(action - n)
    } else {
        ActionClass::NoOp
    }
}

pub struct RlScheduler<P: Policy, S: EventSink = NoopSink> {
    cfg: SchedulerConfig,
    policy: P,
    telemetry: SchedulerTelemetry<S>,
    history: ActionHistory,
}

impl<P: Policy> RlScheduler<P, NoopSink> {
    /// Scheduler without telemetry.
    pub fn without_telemetry(cfg: SchedulerConfig, policy: P) -> Self {
        Self::new(cfg, policy, NoopSink)
    }
}

impl<P: Policy, S: EventSink> RlScheduler<P, S> {
    pub fn new(cfg: SchedulerConfig, policy: P, sink: S) -> Self {
        let telemetry = SchedulerTelemetry::new(cfg.local_address, sink);
        Self {
            cfg,
            policy,
            telemetry,
            history: ActionHistory::new(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.cfg
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn history(&self) -> ActionHistory {
        self.history
    }

    pub fn sink(&self) -> &S {
        self.telemetry.sink()
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.telemetry.sink_mut()
    }

    /// Run one scheduling cycle for `address`.
    ///
    /// Errors only when the policy cannot produce a usable action; every
    /// other "nothing to do" outcome is `SchedulingDecision::NoAction`.
    pub fn get_next_scheduling_action(
        &mut self,
        topology: &dyn TopologyProvider,
        table: &dyn AllocationTable,
        address: ShortAddress,
    ) -> Result<SchedulingDecision, SchedulerError> {
        let mapper = SlotAddressMapper::new(topology, self.cfg.capacity_model);
        let n = mapper.address_space_size();
        if n == 0 {
            return Err(SchedulerError::EmptyAddressSpace);
        }

        let obs = SlotObservation::observe(&mapper, table);
        self.telemetry.log_state(&obs);

        let action = self.decide(&obs)?;

        let decision = match classify(action, n) {
            ActionClass::Allocate(local) => self.allocate_slot(&mapper, address, local),
            ActionClass::Deallocate(local) => self.deallocate_slot(&mapper, table, address, local),
            ActionClass::NoOp => SchedulingDecision::NoAction,
        };
        self.telemetry.flush();
        Ok(decision)
    }

    /// Ask the policy for the next global action and record it.
    pub fn decide(&mut self, obs: &SlotObservation) -> Result<ActionIndex, SchedulerError> {
        self.history.advance();

        let scores = self.policy.evaluate(obs.as_slice())?;
        let action = select_action(&scores, obs.len())?;

        self.history.record(action);
        self.telemetry.log_action(action);
        Ok(action)
    }

    fn allocate_slot(
        &mut self,
        mapper: &SlotAddressMapper<'_>,
        address: ShortAddress,
        local: ActionIndex,
    ) -> SchedulingDecision {
        let mut coord = match mapper.decode(local) {
            Some(c) => c,
            None => {
                self.telemetry
                    .log_decode_anomaly(local, mapper.address_space_size());
                return SchedulingDecision::NoAction;
            }
        };

        // A repeated action means the last request is still pending and
        // not yet visible in the table: try the next superframe instead.
        if self.cfg.escalate_repeated_allocation && self.history.is_repeat() {
            coord = escalate(coord, mapper.multi_superframe_length());
        }

        self.telemetry.log_decision(DecisionKind::Alloc, coord);
        SchedulingDecision::Allocate(GtsRequest::single_tx(address, coord))
    }

    fn deallocate_slot(
        &mut self,
        mapper: &SlotAddressMapper<'_>,
        table: &dyn AllocationTable,
        address: ShortAddress,
        local: ActionIndex,
    ) -> SchedulingDecision {
        let allocated = table.count_allocated(address, Direction::Tx);
        if allocated <= self.cfg.min_tx_slots_retained {
            return SchedulingDecision::NoAction;
        }

        let coord = match mapper.decode(local) {
            Some(c) => c,
            None => {
                self.telemetry
                    .log_decode_anomaly(local, mapper.address_space_size());
                return SchedulingDecision::NoAction;
            }
        };

        let target = match self.cfg.dealloc_target {
            DeallocTarget::Broadcast => NO_SHORT_ADDRESS,
            DeallocTarget::Peer => address,
        };

        self.telemetry.log_decision(DecisionKind::Dealloc, coord);
        SchedulingDecision::Deallocate(GtsRequest::single_tx(target, coord))
    }
}

/// Slot 0 of the superframe after `coord`'s, wrapping at the end of the
/// multi-superframe.
pub fn escalate(coord: SlotCoordinate, multi_superframe_length: usize) -> SlotCoordinate {
    let next = (coord.superframe_id as usize + 1) % multi_superframe_length.max(1);
    SlotCoordinate::new(0, next as u16)
}
