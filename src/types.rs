// src/types.rs
//
// Common shared types for the GTS scheduler: addresses, slot coordinates,
// allocation records and the decision handed back to the MAC layer.

use serde::{Deserialize, Serialize};

/// IEEE 802.15.4 16-bit short address.
pub type ShortAddress = u16;

/// Flat index into the slot address space of one multi-superframe.
pub type ActionIndex = usize;

/// "No short address" marker (0xfffe).
pub const NO_SHORT_ADDRESS: ShortAddress = 0xfffe;

/// Broadcast short address (0xffff).
pub const BROADCAST_ADDRESS: ShortAddress = 0xffff;

/// Direction of a GTS from the local entity's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Tx,
    Rx,
}

impl Direction {
    /// Observation cell value for a slot held in this direction.
    pub fn observation_value(self) -> f32 {
        match self {
            Direction::Tx => 1.0,
            Direction::Rx => -1.0,
        }
    }
}

/// A slot inside one multi-superframe cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotCoordinate {
    /// GTS index within the superframe.
    pub slot_id: u16,
    /// Superframe index within the multi-superframe.
    pub superframe_id: u16,
}

impl SlotCoordinate {
    pub fn new(slot_id: u16, superframe_id: u16) -> Self {
        Self {
            slot_id,
            superframe_id,
        }
    }
}

/// One active slot in the allocation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub slot_id: u16,
    pub superframe_id: u16,
    pub peer_address: ShortAddress,
    pub direction: Direction,
}

impl AllocationRecord {
    pub fn coordinate(&self) -> SlotCoordinate {
        SlotCoordinate::new(self.slot_id, self.superframe_id)
    }
}

/// Payload of an allocation or deallocation request.
///
/// The scheduler always asks for exactly one slot at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GtsRequest {
    pub address: ShortAddress,
    pub direction: Direction,
    pub num_slots: u8,
    pub coordinate: SlotCoordinate,
}

impl GtsRequest {
    /// Single TX slot request at `coordinate` addressed to `address`.
    pub fn single_tx(address: ShortAddress, coordinate: SlotCoordinate) -> Self {
        Self {
            address,
            direction: Direction::Tx,
            num_slots: 1,
            coordinate,
        }
    }
}

/// Outcome of one scheduling cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "management", rename_all = "snake_case")]
pub enum SchedulingDecision {
    Allocate(GtsRequest),
    Deallocate(GtsRequest),
    NoAction,
}

impl SchedulingDecision {
    pub fn is_no_action(&self) -> bool {
        matches!(self, SchedulingDecision::NoAction)
    }

    /// Request payload, if this decision carries one.
    pub fn request(&self) -> Option<&GtsRequest> {
        match self {
            SchedulingDecision::Allocate(req) | SchedulingDecision::Deallocate(req) => Some(req),
            SchedulingDecision::NoAction => None,
        }
    }
}
