// src/config.rs
//
// Central configuration for the GTS scheduler.
//
// Defaults reproduce the reference DSME behaviour (per-superframe capacity
// lookups, repeat escalation on, last TX slot retained, deallocations
// addressed to NO_SHORT_ADDRESS). Values can come from a YAML file and be
// overridden from the environment so experiment harnesses can sweep them
// without code changes.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::ShortAddress;

/// Largest MO - SO difference allowed by IEEE 802.15.4 DSME.
pub const MAX_ORDER_DIFFERENCE: u8 = 14;

/// How superframe capacities are turned into flat action offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityModel {
    /// Query every superframe's own capacity in both directions.
    #[default]
    PerSuperframe,
    /// Superframe 0 has its own capacity; every later superframe is
    /// assumed to have the capacity of superframe 1.
    UniformTail,
}

impl CapacityModel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "per_superframe" | "per-superframe" | "exact" => Some(CapacityModel::PerSuperframe),
            "uniform_tail" | "uniform-tail" | "uniform" => Some(CapacityModel::UniformTail),
            _ => None,
        }
    }
}

/// Address put on deallocation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeallocTarget {
    /// `NO_SHORT_ADDRESS`; the MAC resolves the owner of the slot itself.
    #[default]
    Broadcast,
    /// The peer address passed to the scheduling call.
    Peer,
}

impl DeallocTarget {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "broadcast" | "none" => Some(DeallocTarget::Broadcast),
            "peer" => Some(DeallocTarget::Peer),
            _ => None,
        }
    }
}

/// DSME beacon orders used to build a `DsmeTopology`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Superframe order SO.
    pub superframe_order: u8,
    /// Multi-superframe order MO (MO >= SO).
    pub multi_superframe_order: u8,
    /// With CAP reduction every superframe but the first carries 15 GTS.
    pub cap_reduction: bool,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            superframe_order: 3,
            multi_superframe_order: 5,
            cap_reduction: true,
        }
    }
}

impl TopologyConfig {
    /// 2^(MO - SO).
    pub fn superframes_per_multi_superframe(&self) -> usize {
        1usize << self.multi_superframe_order.saturating_sub(self.superframe_order)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Short address of the local MAC entity (telemetry `id`).
    pub local_address: ShortAddress,
    pub capacity_model: CapacityModel,
    /// Move a repeated allocation to slot 0 of the next superframe.
    pub escalate_repeated_allocation: bool,
    /// TX slots a peer always keeps; deallocation needs strictly more.
    pub min_tx_slots_retained: usize,
    pub dealloc_target: DeallocTarget,
    pub topology: TopologyConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            local_address: 0x0000,
            capacity_model: CapacityModel::PerSuperframe,
            escalate_repeated_allocation: true,
            min_tx_slots_retained: 1,
            dealloc_target: DeallocTarget::Broadcast,
            topology: TopologyConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Load a config from a YAML file. Missing fields take their defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e.to_string(),
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let cfg: SchedulerConfig = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
            source: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let topo = &self.topology;
        if topo.multi_superframe_order < topo.superframe_order {
            return Err(ConfigError::Validation {
                field: "topology.multi_superframe_order".to_string(),
                message: format!(
                    "multi_superframe_order ({}) must be >= superframe_order ({})",
                    topo.multi_superframe_order, topo.superframe_order
                ),
            });
        }
        if topo.multi_superframe_order - topo.superframe_order > MAX_ORDER_DIFFERENCE {
            return Err(ConfigError::Validation {
                field: "topology.multi_superframe_order".to_string(),
                message: format!(
                    "MO - SO must be <= {}, got {}",
                    MAX_ORDER_DIFFERENCE,
                    topo.multi_superframe_order - topo.superframe_order
                ),
            });
        }
        Ok(())
    }

    /// Apply `GTS_*` environment overrides on top of this config.
    ///
    /// Unparseable values are ignored, matching the behaviour of an unset
    /// variable.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup (env-like).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("GTS_LOCAL_ADDRESS") {
            if let Some(v) = parse_short_address(&raw) {
                self.local_address = v;
            }
        }

        if let Some(raw) = lookup("GTS_CAPACITY_MODEL") {
            if let Some(v) = CapacityModel::parse(&raw) {
                self.capacity_model = v;
            }
        }

        if let Some(raw) = lookup("GTS_ESCALATE_REPEATS") {
            match raw.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.escalate_repeated_allocation = true,
                "0" | "false" | "no" => self.escalate_repeated_allocation = false,
                _ => {}
            }
        }

        if let Some(raw) = lookup("GTS_MIN_TX_SLOTS_RETAINED") {
            if let Ok(v) = raw.trim().parse::<usize>() {
                self.min_tx_slots_retained = v;
            }
        }

        if let Some(raw) = lookup("GTS_DEALLOC_TARGET") {
            if let Some(v) = DeallocTarget::parse(&raw) {
                self.dealloc_target = v;
            }
        }
    }
}

/// Parse a short address given in decimal or `0x`-prefixed hex.
pub fn parse_short_address(raw: &str) -> Option<ShortAddress> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => ShortAddress::from_str_radix(hex, 16).ok(),
        None => raw.parse::<ShortAddress>().ok(),
    }
}
