//! Latency model.
//!
//! Transfers are priced by DMA throughput alone:
//!
//! cycles = ⌈bytes / dma_bytes_per_cycle⌉
//!
//! and computation by the operation count spread over the compute array:
//!
//! cycles = ⌈ops / compute_width⌉
//!
//! The total is a strict sum. Transfer and compute phases never overlap.
use crate::error::{checked_product, checked_sum, ModelError, Result};
use crate::memory::HardwareProfile;
use crate::traffic::TrafficBreakdown;
use crate::workload::Workload;
use serde::{Deserialize, Serialize};

/// Cycles spent in each phase of one workload point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyBreakdown {
    pub dram_to_central_cycles: u64,
    pub central_to_local_cycles: u64,
    pub computation_cycles: u64,
    /// Sum of the three phases
    pub total_cycles: u64,
}

impl LatencyBreakdown {
    pub fn new(
        dram_to_central_cycles: u64,
        central_to_local_cycles: u64,
        computation_cycles: u64,
    ) -> Result<Self> {
        let total_cycles = checked_sum(
            &[dram_to_central_cycles, central_to_local_cycles, computation_cycles],
            "total cycles",
        )?;
        Ok(LatencyBreakdown {
            dram_to_central_cycles,
            central_to_local_cycles,
            computation_cycles,
            total_cycles,
        })
    }

    /// Wall-clock view: transfers run on the bus clock, computation on the
    /// compute clock.
    pub fn to_seconds(&self, hw: &HardwareProfile) -> TimeBreakdown {
        let dram_to_central_s = self.dram_to_central_cycles as f64 / hw.bus_frequency_hz;
        let central_to_local_s = self.central_to_local_cycles as f64 / hw.bus_frequency_hz;
        let computation_s = self.computation_cycles as f64 / hw.compute_frequency_hz;
        TimeBreakdown {
            dram_to_central_s,
            central_to_local_s,
            computation_s,
            total_s: dram_to_central_s + central_to_local_s + computation_s,
        }
    }
}

/// Phase durations in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeBreakdown {
    pub dram_to_central_s: f64,
    pub central_to_local_s: f64,
    pub computation_s: f64,
    pub total_s: f64,
}

fn dma_rate(hw: &HardwareProfile) -> Result<f64> {
    let rate = hw.dma_bytes_per_cycle;
    if !(rate.is_finite() && rate > 0.0) {
        return Err(ModelError::InvalidConfiguration(format!(
            "dma_bytes_per_cycle must be a positive finite number, got {rate}"
        )));
    }
    Ok(rate)
}

/// `⌈bytes / dma_bytes_per_cycle⌉`; zero bytes cost zero cycles.
pub fn bytes_to_cycles(bytes: f64, hw: &HardwareProfile) -> Result<u64> {
    let rate = dma_rate(hw)?;
    if bytes.is_nan() || bytes < 0.0 {
        return Err(ModelError::InvalidWorkload(format!("cannot transfer {bytes} bytes")));
    }
    let cycles = (bytes / rate).ceil();
    // 2^64 is the first f64 that does not fit
    if !cycles.is_finite() || cycles >= u64::MAX as f64 {
        return Err(ModelError::ArithmeticOverflow("transfer cycles"));
    }
    Ok(cycles as u64)
}

/// [`bytes_to_cycles`] for an exact byte count. A whole-number rate divides in
/// integers so counts above 2^53 keep every byte.
pub fn transfer_cycles(bytes: u64, hw: &HardwareProfile) -> Result<u64> {
    let rate = dma_rate(hw)?;
    if rate.fract() == 0.0 && rate < u64::MAX as f64 {
        return Ok(bytes.div_ceil(rate as u64));
    }
    bytes_to_cycles(bytes as f64, hw)
}

/// Arithmetic operations of one workload point (a multiply-accumulate counts as two).
pub fn operation_count(workload: &Workload) -> Result<u64> {
    match workload {
        Workload::Gemm(g) => {
            g.validate_shape()?;
            checked_product(&[2, g.dimension, g.dimension, g.dimension], "GEMM operation count")
        }
        Workload::Conv(c) => {
            let out = c.output_side()?;
            checked_product(
                &[2, c.kernel_side, c.kernel_side, c.channels, out, out, c.filters],
                "conv operation count",
            )
        }
    }
}

/// `⌈ops / compute_width⌉`, the same divisor for every workload kind.
pub fn computation_cycles(workload: &Workload, hw: &HardwareProfile) -> Result<u64> {
    if hw.compute_width == 0 {
        return Err(ModelError::InvalidConfiguration("compute_width must be positive".into()));
    }
    Ok(operation_count(workload)?.div_ceil(hw.compute_width))
}

/// Price each link independently, then add computation.
pub fn estimate(
    workload: &Workload,
    traffic: &TrafficBreakdown,
    hw: &HardwareProfile,
) -> Result<LatencyBreakdown> {
    hw.check()?;
    let dram = transfer_cycles(traffic.dram_to_central_bytes, hw)?;
    let local = bytes_to_cycles(traffic.central_to_local_bytes, hw)?;
    let compute = computation_cycles(workload, hw)?;
    LatencyBreakdown::new(dram, local, compute)
}
