// src/topology.rs
//
// Superframe topology providers.
//
// The scheduler only ever asks two questions: how many superframes make up
// one multi-superframe, and how many GTS a given superframe carries. Both
// are answered fresh every cycle; nothing derived from them is cached.

use crate::config::TopologyConfig;

/// GTS per superframe without CAP reduction (and always for superframe 0).
pub const GTS_PER_SUPERFRAME: usize = 7;

/// GTS per superframe for superframes >= 1 when CAP reduction is enabled.
pub const GTS_PER_SUPERFRAME_CAP_REDUCED: usize = 15;

/// Source of per-superframe slot capacities.
pub trait TopologyProvider {
    /// Number of GTS in superframe `superframe_id`.
    fn capacity(&self, superframe_id: usize) -> usize;

    /// Number of superframes per multi-superframe.
    fn multi_superframe_length(&self) -> usize;
}

/// Topology with an explicit capacity list, one entry per superframe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticTopology {
    capacities: Vec<usize>,
}

impl StaticTopology {
    pub fn new(capacities: Vec<usize>) -> Self {
        Self { capacities }
    }

    /// `first` slots in superframe 0, `rest` slots in each of the others.
    pub fn uniform_tail(first: usize, rest: usize, superframes: usize) -> Self {
        let capacities = (0..superframes)
            .map(|sf| if sf == 0 { first } else { rest })
            .collect();
        Self { capacities }
    }

    pub fn capacities(&self) -> &[usize] {
        &self.capacities
    }
}

impl TopologyProvider for StaticTopology {
    fn capacity(&self, superframe_id: usize) -> usize {
        self.capacities.get(superframe_id).copied().unwrap_or(0)
    }

    fn multi_superframe_length(&self) -> usize {
        self.capacities.len()
    }
}

/// IEEE 802.15.4 DSME topology derived from SO / MO and CAP reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsmeTopology {
    superframes: usize,
    cap_reduction: bool,
}

impl DsmeTopology {
    pub fn new(superframes: usize, cap_reduction: bool) -> Self {
        Self {
            superframes,
            cap_reduction,
        }
    }

    pub fn from_config(cfg: &TopologyConfig) -> Self {
        Self::new(cfg.superframes_per_multi_superframe(), cfg.cap_reduction)
    }

    pub fn cap_reduction(&self) -> bool {
        self.cap_reduction
    }
}

impl TopologyProvider for DsmeTopology {
    fn capacity(&self, superframe_id: usize) -> usize {
        if superframe_id >= self.superframes {
            0
        } else if superframe_id == 0 || !self.cap_reduction {
            GTS_PER_SUPERFRAME
        } else {
            GTS_PER_SUPERFRAME_CAP_REDUCED
        }
    }

    fn multi_superframe_length(&self) -> usize {
        self.superframes
    }
}
