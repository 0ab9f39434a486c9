//! Memory hierarchy description.
//! Models the three tiers of accelerator memory:
//!   - DRAM: off-chip, largest and slowest
//!   - Central SRAM: shared on-chip buffer between DRAM and the compute array
//!   - Local SRAM: small scratchpad attached directly to the compute array
use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * 1024;

/// One tier of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryTier {
    Dram,
    Central,
    Local,
}

impl MemoryTier {
    pub const ALL: [MemoryTier; 3] = [MemoryTier::Dram, MemoryTier::Central, MemoryTier::Local];
}

impl std::fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryTier::Dram    => write!(f, "DRAM"),
            MemoryTier::Central => write!(f, "Central SRAM"),
            MemoryTier::Local   => write!(f, "Local SRAM"),
        }
    }
}

/// Hardware resource description shared read-only by every analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareProfile {
    /// Off-chip DRAM capacity in bytes
    pub dram_capacity_bytes: u64,
    /// Shared on-chip SRAM capacity in bytes
    pub central_capacity_bytes: u64,
    /// Compute-local SRAM capacity in bytes
    pub local_capacity_bytes: u64,
    pub dram_latency_cycles: u64,
    pub central_latency_cycles: u64,
    pub local_latency_cycles: u64,
    /// DMA throughput, bytes moved per bus cycle
    pub dma_bytes_per_cycle: f64,
    pub bus_frequency_hz: f64,
    pub compute_frequency_hz: f64,
    /// Operations the compute array retires per cycle
    pub compute_width: u64,
}

impl HardwareProfile {
    /// Reference CGRA configuration: 32 MiB DRAM, 512 KiB central SRAM,
    /// 32 KiB local SRAM, 16 B/cycle DMA, 100 MHz bus and compute clocks.
    pub fn cgra_default() -> Self {
        HardwareProfile {
            dram_capacity_bytes: 32 * MIB,
            central_capacity_bytes: 512 * KIB,
            local_capacity_bytes: 32 * KIB,
            dram_latency_cycles: 100,
            central_latency_cycles: 10,
            local_latency_cycles: 1,
            dma_bytes_per_cycle: 16.0,
            bus_frequency_hz: 100e6,
            compute_frequency_hz: 100e6,
            compute_width: 4,
        }
    }

    pub fn with_capacities(mut self, dram: u64, central: u64, local: u64) -> Self {
        self.dram_capacity_bytes = dram;
        self.central_capacity_bytes = central;
        self.local_capacity_bytes = local;
        self
    }

    pub fn with_latencies(mut self, dram: u64, central: u64, local: u64) -> Self {
        self.dram_latency_cycles = dram;
        self.central_latency_cycles = central;
        self.local_latency_cycles = local;
        self
    }

    pub fn with_dma_bytes_per_cycle(mut self, rate: f64) -> Self {
        self.dma_bytes_per_cycle = rate;
        self
    }

    pub fn with_frequencies(mut self, bus_hz: f64, compute_hz: f64) -> Self {
        self.bus_frequency_hz = bus_hz;
        self.compute_frequency_hz = compute_hz;
        self
    }

    pub fn with_compute_width(mut self, width: u64) -> Self {
        self.compute_width = width;
        self
    }

    /// Check the profile invariants, returning the profile unchanged on success.
    pub fn validate(self) -> Result<Self> {
        self.check()?;
        Ok(self)
    }

    /// Every capacity and the compute width are positive, every rate and
    /// clock is positive and finite.
    pub fn check(&self) -> Result<()> {
        let capacities = [
            ("dram_capacity_bytes", self.dram_capacity_bytes),
            ("central_capacity_bytes", self.central_capacity_bytes),
            ("local_capacity_bytes", self.local_capacity_bytes),
            ("compute_width", self.compute_width),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(ModelError::InvalidConfiguration(format!("{name} must be positive")));
            }
        }

        let rates = [
            ("dma_bytes_per_cycle", self.dma_bytes_per_cycle),
            ("bus_frequency_hz", self.bus_frequency_hz),
            ("compute_frequency_hz", self.compute_frequency_hz),
        ];
        for (name, value) in rates {
            // NaN fails this comparison too
            if !(value.is_finite() && value > 0.0) {
                return Err(ModelError::InvalidConfiguration(format!(
                    "{name} must be a positive finite number, got {value}"
                )));
            }
        }

        Ok(())
    }

    /// Capacity of one tier in bytes.
    pub fn capacity(&self, tier: MemoryTier) -> u64 {
        match tier {
            MemoryTier::Dram    => self.dram_capacity_bytes,
            MemoryTier::Central => self.central_capacity_bytes,
            MemoryTier::Local   => self.local_capacity_bytes,
        }
    }

    /// Access latency of one tier in cycles.
    pub fn latency_cycles(&self, tier: MemoryTier) -> u64 {
        match tier {
            MemoryTier::Dram    => self.dram_latency_cycles,
            MemoryTier::Central => self.central_latency_cycles,
            MemoryTier::Local   => self.local_latency_cycles,
        }
    }
}

impl Default for HardwareProfile {
    fn default() -> Self {
        Self::cgra_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_matches_reference_sizes() {
        let hw = HardwareProfile::cgra_default().validate().unwrap();
        assert_eq!(hw.capacity(MemoryTier::Dram), 33_554_432);
        assert_eq!(hw.capacity(MemoryTier::Central), 524_288);
        assert_eq!(hw.capacity(MemoryTier::Local), 32_768);
        assert_eq!(hw.latency_cycles(MemoryTier::Dram), 100);
        assert_eq!(hw.compute_width, 4);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = HardwareProfile::cgra_default()
            .with_capacities(32 * MIB, 0, 32 * KIB)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfiguration(msg) if msg.contains("central")));
    }

    #[test]
    fn non_positive_rates_are_rejected() {
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = HardwareProfile::cgra_default()
                .with_dma_bytes_per_cycle(rate)
                .validate();
            assert!(result.is_err(), "rate {rate} accepted");
        }
        assert!(HardwareProfile::cgra_default().with_frequencies(0.0, 1e6).validate().is_err());
        assert!(HardwareProfile::cgra_default().with_compute_width(0).validate().is_err());
    }

    #[test]
    fn tier_names() {
        let names: Vec<String> = MemoryTier::ALL.iter().map(|t| t.to_string()).collect();
        assert_eq!(names, ["DRAM", "Central SRAM", "Local SRAM"]);
    }
}
