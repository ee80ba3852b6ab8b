// src/rl/observation.rs
//
// Observation vector for the slot policy.
//
// One cell per position of the slot address space, ordered by flat action
// index: +1 for a TX slot, -1 for an RX slot, 0 for a free slot. The
// vector is rebuilt from the allocation table every cycle and never reused.

use serde::{Deserialize, Serialize};

use super::address_map::{block_superframe, SlotAddressMapper};
use crate::allocation::AllocationTable;
use crate::types::{ActionIndex, SlotCoordinate};

/// Cell value of a free slot.
pub const FREE: f32 = 0.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotObservation {
    /// Cell values ordered by flat action index.
    pub slots: Vec<f32>,
    /// Table records whose coordinate does not exist in the current topology.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub out_of_range: Vec<SlotCoordinate>,
}

impl SlotObservation {
    /// All-free observation of the given size.
    pub fn empty(size: usize) -> Self {
        Self {
            slots: vec![FREE; size],
            out_of_range: Vec::new(),
        }
    }

    /// Build the observation for the current topology and table.
    ///
    /// If two records share a coordinate the later one wins; the table is
    /// expected never to hold such duplicates.
    pub fn observe(mapper: &SlotAddressMapper<'_>, table: &dyn AllocationTable) -> Self {
        let mut obs = Self::empty(mapper.address_space_size());

        for record in table.records() {
            let coord = record.coordinate();
            match mapper.encode(coord) {
                Some(idx) => obs.slots[idx] = record.direction.observation_value(),
                None => obs.out_of_range.push(coord),
            }
        }

        obs
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.slots
    }

    /// Mark the superframe containing `action` as blocked.
    pub fn block_superframe(&mut self, mapper: &SlotAddressMapper<'_>, action: ActionIndex) -> bool {
        block_superframe(&mut self.slots, mapper, action)
    }

    /// Number of occupied cells (TX or RX).
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|&&v| v != FREE).count()
    }
}
