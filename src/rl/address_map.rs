// src/rl/address_map.rs
//
// Slot address space: bijection between (slot, superframe) coordinates and
// a flat action index.
//
// Layout: superframe 0's slots first, then superframe 1's, and so on, each
// superframe occupying a contiguous range. A mapper is built from a live
// topology snapshot every cycle and must not outlive a topology change.
//
// Both directions use the same `CapacityModel`, so encode/decode stay
// mutual inverses for every coordinate valid under that model.

use std::ops::Range;

use crate::config::CapacityModel;
use crate::topology::TopologyProvider;
use crate::types::{ActionIndex, SlotCoordinate};

/// Observation value marking a blocked slot.
pub const BLOCKED: f32 = -1.0;

pub struct SlotAddressMapper<'a> {
    topology: &'a dyn TopologyProvider,
    model: CapacityModel,
}

impl<'a> SlotAddressMapper<'a> {
    pub fn new(topology: &'a dyn TopologyProvider, model: CapacityModel) -> Self {
        Self { topology, model }
    }

    pub fn model(&self) -> CapacityModel {
        self.model
    }

    pub fn multi_superframe_length(&self) -> usize {
        self.topology.multi_superframe_length()
    }

    /// Capacity of `superframe_id` as seen by the active model.
    pub fn capacity(&self, superframe_id: usize) -> usize {
        if superframe_id >= self.multi_superframe_length() {
            return 0;
        }
        match self.model {
            CapacityModel::PerSuperframe => self.topology.capacity(superframe_id),
            CapacityModel::UniformTail => {
                if superframe_id == 0 {
                    self.topology.capacity(0)
                } else {
                    self.topology.capacity(1)
                }
            }
        }
    }

    /// First flat index of `superframe_id`.
    pub fn superframe_start(&self, superframe_id: usize) -> ActionIndex {
        match self.model {
            CapacityModel::PerSuperframe => (0..superframe_id).map(|sf| self.capacity(sf)).sum(),
            CapacityModel::UniformTail => {
                let mut start = 0;
                if superframe_id > 0 {
                    start += self.topology.capacity(0);
                }
                if superframe_id > 1 {
                    start += self.topology.capacity(1) * (superframe_id - 1);
                }
                start
            }
        }
    }

    /// Flat index range covered by `superframe_id`.
    pub fn superframe_range(&self, superframe_id: usize) -> Range<ActionIndex> {
        let start = self.superframe_start(superframe_id);
        start..start + self.capacity(superframe_id)
    }

    /// Size N of the address space: total slots in one multi-superframe.
    pub fn address_space_size(&self) -> usize {
        self.superframe_start(self.multi_superframe_length())
    }

    pub fn is_valid(&self, coord: SlotCoordinate) -> bool {
        let sf = coord.superframe_id as usize;
        sf < self.multi_superframe_length() && (coord.slot_id as usize) < self.capacity(sf)
    }

    /// Flat index of `coord`, or None if the coordinate does not exist in
    /// the current topology.
    pub fn encode(&self, coord: SlotCoordinate) -> Option<ActionIndex> {
        if !self.is_valid(coord) {
            return None;
        }
        Some(self.superframe_start(coord.superframe_id as usize) + coord.slot_id as usize)
    }

    /// Coordinate of flat index `index`, or None if `index >= N`.
    pub fn decode(&self, index: ActionIndex) -> Option<SlotCoordinate> {
        let mut remaining = index;
        for sf in 0..self.multi_superframe_length() {
            let capacity = self.capacity(sf);
            if remaining < capacity {
                return Some(SlotCoordinate::new(
                    u16::try_from(remaining).ok()?,
                    u16::try_from(sf).ok()?,
                ));
            }
            remaining -= capacity;
        }
        None
    }
}

/// Mark every slot of the superframe containing `action` as blocked.
///
/// Returns false and leaves `slots` untouched when `action` is outside the
/// address space.
pub fn block_superframe(
    slots: &mut [f32],
    mapper: &SlotAddressMapper<'_>,
    action: ActionIndex,
) -> bool {
    let coord = match mapper.decode(action) {
        Some(c) => c,
        None => return false,
    };
    let range = mapper.superframe_range(coord.superframe_id as usize);
    let end = range.end.min(slots.len());
    let start = range.start.min(end);
    slots[start..end].fill(BLOCKED);
    true
}
