//! Capacity utilization: how much of each memory tier one workload point's
//! footprint would occupy, saturating at a full tier.
use crate::memory::{HardwareProfile, MemoryTier};
use serde::{Deserialize, Serialize};

/// Fractions in [0.0, 1.0], one per tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtilizationBreakdown {
    pub dram: f64,
    pub central: f64,
    pub local: f64,
}

impl UtilizationBreakdown {
    pub fn compute(total_footprint_bytes: u64, hw: &HardwareProfile) -> Self {
        UtilizationBreakdown {
            dram: fraction(total_footprint_bytes, hw.capacity(MemoryTier::Dram)),
            central: fraction(total_footprint_bytes, hw.capacity(MemoryTier::Central)),
            local: fraction(total_footprint_bytes, hw.capacity(MemoryTier::Local)),
        }
    }

    pub fn get(&self, tier: MemoryTier) -> f64 {
        match tier {
            MemoryTier::Dram    => self.dram,
            MemoryTier::Central => self.central,
            MemoryTier::Local   => self.local,
        }
    }
}

/// `min(1.0, footprint / capacity)`.
pub fn fraction(footprint_bytes: u64, capacity_bytes: u64) -> f64 {
    (footprint_bytes as f64 / capacity_bytes as f64).min(1.0)
}
