// src/allocation.rs
//
// Allocation counter table abstraction.
//
// The table is owned by the MAC layer; the scheduler only enumerates it and
// asks for per-peer counts. `InMemoryAllocationTable` backs tests and the
// command-line harness.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{
    AllocationRecord, Direction, SchedulingDecision, ShortAddress, SlotCoordinate,
};

/// Read-only view of the active GTS allocations.
pub trait AllocationTable {
    /// Enumerate all active records. Restartable: every call starts over.
    fn records(&self) -> Box<dyn Iterator<Item = AllocationRecord> + '_>;

    /// Number of slots allocated to `address` in `direction`.
    fn count_allocated(&self, address: ShortAddress, direction: Direction) -> usize {
        self.records()
            .filter(|r| r.peer_address == address && r.direction == direction)
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryAllocationTable {
    records: Vec<AllocationRecord>,
}

impl InMemoryAllocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<AllocationRecord>) -> Self {
        Self { records }
    }

    /// Load a JSON array of records.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        use anyhow::Context;

        let contents = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read allocation table: {}", path.as_ref().display())
        })?;
        let records: Vec<AllocationRecord> = serde_json::from_str(&contents).with_context(|| {
            format!("Failed to parse allocation table: {}", path.as_ref().display())
        })?;
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, coordinate: SlotCoordinate) -> Option<&AllocationRecord> {
        self.records.iter().find(|r| r.coordinate() == coordinate)
    }

    /// Insert a record. Returns false (and leaves the table untouched) when
    /// the slot is already taken.
    pub fn insert(&mut self, record: AllocationRecord) -> bool {
        if self.get(record.coordinate()).is_some() {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn remove(&mut self, coordinate: SlotCoordinate) -> Option<AllocationRecord> {
        let idx = self
            .records
            .iter()
            .position(|r| r.coordinate() == coordinate)?;
        Some(self.records.remove(idx))
    }

    /// Apply a decision as if the MAC handshake succeeded.
    ///
    /// Allocations are recorded against `peer` since the decision's address
    /// may be a broadcast marker. Returns whether the table changed.
    pub fn apply(&mut self, decision: &SchedulingDecision, peer: ShortAddress) -> bool {
        match decision {
            SchedulingDecision::Allocate(req) => self.insert(AllocationRecord {
                slot_id: req.coordinate.slot_id,
                superframe_id: req.coordinate.superframe_id,
                peer_address: peer,
                direction: req.direction,
            }),
            SchedulingDecision::Deallocate(req) => match self.get(req.coordinate) {
                Some(r) if r.direction == req.direction => self.remove(req.coordinate).is_some(),
                _ => false,
            },
            SchedulingDecision::NoAction => false,
        }
    }
}

impl AllocationTable for InMemoryAllocationTable {
    fn records(&self) -> Box<dyn Iterator<Item = AllocationRecord> + '_> {
        Box::new(self.records.iter().copied())
    }
}
