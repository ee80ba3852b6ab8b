// tests/scheduler_tests.rs
//
// End-to-end scheduling cycles against constructed topologies, tables and
// fake policies.

use gts_scheduler::error::PolicyError;
use gts_scheduler::rl::{Activation, DenseLayer, DenseWeights};
use gts_scheduler::{
    ActionHistory, AllocationRecord, CapacityModel, DeallocTarget, DensePolicy, Direction,
    GtsRequest, InMemoryAllocationTable, MemorySink, NoopPolicy, Policy, RlScheduler,
    SchedulerConfig, SchedulerError, SchedulingDecision, ShortAddress, SlotAddressMapper,
    SlotCoordinate, SlotObservation, StaticTopology, NO_SHORT_ADDRESS,
};

const PEER: ShortAddress = 0x0002;

/// Policy that always scores one fixed action highest.
struct Pick(usize);

impl Policy for Pick {
    fn version(&self) -> &str {
        "pick-test"
    }

    fn evaluate(&self, observation: &[f32]) -> Result<Vec<f32>, PolicyError> {
        let len = (2 * observation.len() + 1).max(self.0 + 1);
        let mut scores = vec![0.0; len];
        scores[self.0] = 1.0;
        Ok(scores)
    }
}

/// Policy that returns a canned score vector regardless of input.
struct Canned(Vec<f32>);

impl Policy for Canned {
    fn version(&self) -> &str {
        "canned-test"
    }

    fn evaluate(&self, _observation: &[f32]) -> Result<Vec<f32>, PolicyError> {
        Ok(self.0.clone())
    }
}

struct Offline;

impl Policy for Offline {
    fn version(&self) -> &str {
        "offline-test"
    }

    fn evaluate(&self, _observation: &[f32]) -> Result<Vec<f32>, PolicyError> {
        Err(PolicyError::Unavailable {
            reason: "model not loaded".to_string(),
        })
    }
}

fn tx(slot: u16, sf: u16, peer: ShortAddress) -> AllocationRecord {
    AllocationRecord {
        slot_id: slot,
        superframe_id: sf,
        peer_address: peer,
        direction: Direction::Tx,
    }
}

fn rx(slot: u16, sf: u16, peer: ShortAddress) -> AllocationRecord {
    AllocationRecord {
        direction: Direction::Rx,
        ..tx(slot, sf, peer)
    }
}

fn scheduler<P: Policy>(policy: P) -> RlScheduler<P, MemorySink> {
    let cfg = SchedulerConfig {
        local_address: 0x0001,
        ..SchedulerConfig::default()
    };
    RlScheduler::new(cfg, policy, MemorySink::new())
}

/// N = 5: superframe 0 has 2 slots, superframe 1 has 3.
fn five_slot_topology() -> StaticTopology {
    StaticTopology::new(vec![2, 3])
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

#[test]
fn observation_marks_tx_and_rx_cells() {
    let topo = StaticTopology::uniform_tail(3, 4, 3);
    let table = InMemoryAllocationTable::from_records(vec![tx(2, 1, PEER), rx(0, 0, PEER)]);

    let mapper = SlotAddressMapper::new(&topo, CapacityModel::PerSuperframe);
    let obs = SlotObservation::observe(&mapper, &table);

    let tx_idx = mapper.encode(SlotCoordinate::new(2, 1)).unwrap();
    let rx_idx = mapper.encode(SlotCoordinate::new(0, 0)).unwrap();
    assert_eq!(obs.len(), 11);
    for (idx, &value) in obs.slots.iter().enumerate() {
        let expected = if idx == tx_idx {
            1.0
        } else if idx == rx_idx {
            -1.0
        } else {
            0.0
        };
        assert_eq!(value, expected, "cell {idx}");
    }
}

#[test]
fn observation_is_logged_verbatim_before_the_decision() {
    let topo = StaticTopology::uniform_tail(3, 4, 3);
    let table = InMemoryAllocationTable::from_records(vec![tx(2, 1, PEER), rx(0, 0, PEER)]);
    let mut s = scheduler(NoopPolicy::new());

    s.get_next_scheduling_action(&topo, &table, PEER).unwrap();

    let records = s.sink().records();
    assert_eq!(records[0]["id"], 1);
    let slots: Vec<f64> = records[0]["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    assert_eq!(slots.len(), 11);
    assert_eq!(slots[0], -1.0);
    assert_eq!(slots[5], 1.0);
    assert_eq!(slots.iter().filter(|&&v| v == 0.0).count(), 9);
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[test]
fn last_allocate_index_allocates() {
    let topo = five_slot_topology();
    let mut s = scheduler(Pick(4));
    let decision = s
        .get_next_scheduling_action(&topo, &InMemoryAllocationTable::new(), PEER)
        .unwrap();

    assert_eq!(
        decision,
        SchedulingDecision::Allocate(GtsRequest::single_tx(PEER, SlotCoordinate::new(2, 1)))
    );
}

#[test]
fn first_and_last_deallocate_indices() {
    let topo = five_slot_topology();
    let table = InMemoryAllocationTable::from_records(vec![tx(0, 0, PEER), tx(2, 1, PEER)]);

    let mut first = scheduler(Pick(5));
    assert_eq!(
        first.get_next_scheduling_action(&topo, &table, PEER).unwrap(),
        SchedulingDecision::Deallocate(GtsRequest::single_tx(
            NO_SHORT_ADDRESS,
            SlotCoordinate::new(0, 0)
        ))
    );

    let mut last = scheduler(Pick(9));
    assert_eq!(
        last.get_next_scheduling_action(&topo, &table, PEER).unwrap(),
        SchedulingDecision::Deallocate(GtsRequest::single_tx(
            NO_SHORT_ADDRESS,
            SlotCoordinate::new(2, 1)
        ))
    );
}

#[test]
fn index_two_n_is_no_action() {
    let topo = five_slot_topology();
    let mut s = scheduler(Pick(10));
    let decision = s
        .get_next_scheduling_action(&topo, &InMemoryAllocationTable::new(), PEER)
        .unwrap();

    assert_eq!(decision, SchedulingDecision::NoAction);
    // History still tracks the raw global action.
    assert_eq!(s.history().current, 10);
}

#[test]
fn noop_policy_never_acts() {
    let topo = StaticTopology::uniform_tail(7, 15, 4);
    let mut s = scheduler(NoopPolicy::new());
    for _ in 0..3 {
        let decision = s
            .get_next_scheduling_action(&topo, &InMemoryAllocationTable::new(), PEER)
            .unwrap();
        assert!(decision.is_no_action());
    }
}

// ---------------------------------------------------------------------------
// Escalation
// ---------------------------------------------------------------------------

#[test]
fn repeated_allocation_moves_to_next_superframe_slot_zero() {
    let topo = StaticTopology::new(vec![3, 4, 4, 4]);
    let table = InMemoryAllocationTable::new();
    // Index 5 decodes to slot 2 of superframe 1.
    let mut s = scheduler(Pick(5));

    let first = s.get_next_scheduling_action(&topo, &table, PEER).unwrap();
    assert_eq!(first.request().unwrap().coordinate, SlotCoordinate::new(2, 1));

    let second = s.get_next_scheduling_action(&topo, &table, PEER).unwrap();
    assert_eq!(second.request().unwrap().coordinate, SlotCoordinate::new(0, 2));
    assert_eq!(s.history(), ActionHistory { current: 5, previous: 5 });
}

#[test]
fn escalation_wraps_around_the_multi_superframe() {
    let topo = StaticTopology::new(vec![3, 4, 4, 4]);
    let table = InMemoryAllocationTable::new();
    // Index 14 decodes to slot 3 of the last superframe.
    let mut s = scheduler(Pick(14));

    s.get_next_scheduling_action(&topo, &table, PEER).unwrap();
    let repeated = s.get_next_scheduling_action(&topo, &table, PEER).unwrap();
    assert_eq!(
        repeated.request().unwrap().coordinate,
        SlotCoordinate::new(0, 0)
    );
}

#[test]
fn initial_history_counts_action_zero_as_repeat() {
    let topo = StaticTopology::new(vec![3, 4]);
    let mut s = scheduler(Pick(0));

    let decision = s
        .get_next_scheduling_action(&topo, &InMemoryAllocationTable::new(), PEER)
        .unwrap();
    assert_eq!(
        decision.request().unwrap().coordinate,
        SlotCoordinate::new(0, 1)
    );
}

#[test]
fn escalation_can_be_disabled() {
    let topo = StaticTopology::new(vec![3, 4, 4]);
    let cfg = SchedulerConfig {
        escalate_repeated_allocation: false,
        ..SchedulerConfig::default()
    };
    let mut s = RlScheduler::new(cfg, Pick(5), MemorySink::new());
    let table = InMemoryAllocationTable::new();

    let a = s.get_next_scheduling_action(&topo, &table, PEER).unwrap();
    let b = s.get_next_scheduling_action(&topo, &table, PEER).unwrap();
    assert_eq!(a, b);
    assert_eq!(b.request().unwrap().coordinate, SlotCoordinate::new(2, 1));
}

#[test]
fn deallocation_is_never_escalated() {
    let topo = five_slot_topology();
    let table = InMemoryAllocationTable::from_records(vec![tx(0, 0, PEER), tx(1, 0, PEER)]);
    let mut s = scheduler(Pick(6));

    let a = s.get_next_scheduling_action(&topo, &table, PEER).unwrap();
    let b = s.get_next_scheduling_action(&topo, &table, PEER).unwrap();
    assert_eq!(a, b);
    assert_eq!(b.request().unwrap().coordinate, SlotCoordinate::new(1, 0));
}

// ---------------------------------------------------------------------------
// Retention guard
// ---------------------------------------------------------------------------

#[test]
fn last_tx_slot_is_retained() {
    let topo = five_slot_topology();
    let table = InMemoryAllocationTable::from_records(vec![
        tx(0, 0, PEER),
        // Slots of other peers and RX slots do not count.
        tx(1, 0, 0x0009),
        rx(0, 1, PEER),
    ]);
    let mut s = scheduler(Pick(5));

    let decision = s.get_next_scheduling_action(&topo, &table, PEER).unwrap();
    assert_eq!(decision, SchedulingDecision::NoAction);
    assert!(s
        .sink()
        .records()
        .iter()
        .all(|r| r["action"] != "dealloc"));
}

#[test]
fn two_tx_slots_allow_deallocation() {
    let topo = five_slot_topology();
    let table = InMemoryAllocationTable::from_records(vec![tx(0, 0, PEER), tx(1, 1, PEER)]);
    let mut s = scheduler(Pick(5 + 3));

    let decision = s.get_next_scheduling_action(&topo, &table, PEER).unwrap();
    assert_eq!(
        decision,
        SchedulingDecision::Deallocate(GtsRequest::single_tx(
            NO_SHORT_ADDRESS,
            SlotCoordinate::new(1, 1)
        ))
    );
}

#[test]
fn peer_scoped_deallocation_target() {
    let topo = five_slot_topology();
    let table = InMemoryAllocationTable::from_records(vec![tx(0, 0, PEER), tx(1, 1, PEER)]);
    let cfg = SchedulerConfig {
        dealloc_target: DeallocTarget::Peer,
        ..SchedulerConfig::default()
    };
    let mut s = RlScheduler::new(cfg, Pick(5), MemorySink::new());

    let decision = s.get_next_scheduling_action(&topo, &table, PEER).unwrap();
    assert_eq!(decision.request().unwrap().address, PEER);
}

#[test]
fn retention_threshold_is_configurable() {
    let topo = five_slot_topology();
    let table = InMemoryAllocationTable::from_records(vec![tx(0, 0, PEER), tx(1, 1, PEER)]);
    let cfg = SchedulerConfig {
        min_tx_slots_retained: 2,
        ..SchedulerConfig::default()
    };
    let mut s = RlScheduler::new(cfg, Pick(5), MemorySink::new());

    let decision = s.get_next_scheduling_action(&topo, &table, PEER).unwrap();
    assert!(decision.is_no_action());
}

// ---------------------------------------------------------------------------
// Determinism
// ---------------------------------------------------------------------------

#[test]
fn identical_inputs_and_history_give_identical_decisions() {
    let topo = StaticTopology::uniform_tail(7, 15, 4);
    let table = InMemoryAllocationTable::from_records(vec![tx(3, 2, PEER), rx(1, 0, 0x0007)]);

    let mut a = scheduler(Pick(20));
    let mut b = scheduler(Pick(20));

    let mut trace_a = Vec::new();
    let mut trace_b = Vec::new();
    for _ in 0..4 {
        trace_a.push(a.get_next_scheduling_action(&topo, &table, PEER).unwrap());
        trace_b.push(b.get_next_scheduling_action(&topo, &table, PEER).unwrap());
    }
    assert_eq!(trace_a, trace_b);
    // Once previous == current, the decision stays put.
    assert_eq!(trace_a[1], trace_a[2]);
    assert_eq!(trace_a[2], trace_a[3]);
    assert_eq!(a.sink().records(), b.sink().records());
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn short_policy_output_is_a_configuration_error() {
    let topo = five_slot_topology();
    let mut s = scheduler(Canned(vec![1.0; 9]));

    let err = s
        .get_next_scheduling_action(&topo, &InMemoryAllocationTable::new(), PEER)
        .unwrap_err();
    assert_eq!(
        err,
        SchedulerError::MalformedPolicyOutput {
            expected_min: 10,
            actual: 9
        }
    );
}

#[test]
fn all_nan_output_is_a_configuration_error() {
    let topo = five_slot_topology();
    let mut s = scheduler(Canned(vec![f32::NAN; 11]));

    let err = s
        .get_next_scheduling_action(&topo, &InMemoryAllocationTable::new(), PEER)
        .unwrap_err();
    assert_eq!(err, SchedulerError::NonFinitePolicyOutput { len: 11 });
}

#[test]
fn unavailable_policy_propagates() {
    let topo = five_slot_topology();
    let mut s = scheduler(Offline);

    let err = s
        .get_next_scheduling_action(&topo, &InMemoryAllocationTable::new(), PEER)
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulerError::Policy(PolicyError::Unavailable { .. })
    ));
    assert!(err.to_string().contains("model not loaded"));
}

#[test]
fn empty_topology_is_rejected_before_the_policy_runs() {
    let topo = StaticTopology::new(vec![]);
    let mut s = scheduler(Offline);

    let err = s
        .get_next_scheduling_action(&topo, &InMemoryAllocationTable::new(), PEER)
        .unwrap_err();
    assert_eq!(err, SchedulerError::EmptyAddressSpace);
    assert!(s.sink().records().is_empty());
}

// ---------------------------------------------------------------------------
// Telemetry
// ---------------------------------------------------------------------------

#[test]
fn allocation_cycle_emits_state_action_and_decision() {
    let topo = StaticTopology::new(vec![3, 4, 4, 4]);
    let mut s = scheduler(Pick(5));

    s.get_next_scheduling_action(&topo, &InMemoryAllocationTable::new(), PEER)
        .unwrap();

    let records = s.sink().records();
    assert_eq!(records.len(), 3);
    assert!(records[0].get("slots").is_some());
    assert_eq!(records[1]["action"], 5);
    assert_eq!(records[2]["action"], "alloc");
    assert_eq!(records[2]["slot"], 2);
    assert_eq!(records[2]["superframe"], 1);
    assert!(records.iter().all(|r| r["id"] == 1));
}

#[test]
fn dense_policy_drives_the_pipeline() {
    // N = 5 inputs, 2N + 1 = 11 outputs; zero weights, bias picks index 7.
    let mut biases = vec![0.0; 11];
    biases[7] = 1.0;
    let policy = DensePolicy::new(DenseWeights {
        version: "dense-bias".to_string(),
        layers: vec![DenseLayer {
            weights: vec![vec![0.0; 5]; 11],
            biases,
            activation: Activation::Linear,
        }],
    })
    .unwrap();

    let topo = five_slot_topology();
    let table = InMemoryAllocationTable::from_records(vec![tx(0, 0, PEER), tx(1, 0, PEER)]);
    let mut s = scheduler(policy);

    let decision = s.get_next_scheduling_action(&topo, &table, PEER).unwrap();
    assert_eq!(
        decision,
        SchedulingDecision::Deallocate(GtsRequest::single_tx(
            NO_SHORT_ADDRESS,
            SlotCoordinate::new(0, 1)
        ))
    );
}

#[test]
fn applied_decisions_show_up_in_the_next_observation() {
    let topo = five_slot_topology();
    let mut table = InMemoryAllocationTable::new();
    let mut s = scheduler(Pick(3));

    let decision = s.get_next_scheduling_action(&topo, &table, PEER).unwrap();
    assert!(table.apply(&decision, PEER));

    s.get_next_scheduling_action(&topo, &table, PEER).unwrap();
    let state = s
        .sink()
        .records()
        .iter()
        .filter(|r| r.get("slots").is_some())
        .nth(1)
        .unwrap()
        .clone();
    assert_eq!(state["slots"][3], 1.0);
}
