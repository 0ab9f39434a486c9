//! Traffic model: bytes moved across each hierarchy boundary.
//!
//! Two physical links are modeled:
//!   DRAM ↔ Central SRAM   only used when the footprint overflows central SRAM
//!   Central ↔ Local SRAM  always used, scaled by the buffer-reload multiplier
//!
//! Both links see the same tiling-aware transfer volume. The local link is
//! additionally multiplied by `reload = max(1, working_set / local_capacity)`,
//! a continuous factor for repeatedly streaming a working set through a
//! scratchpad smaller than it.
use crate::error::{checked_product, checked_sum, ModelError, Result};
use crate::footprint::{MemoryFootprint, TensorBytes};
use crate::memory::HardwareProfile;
use crate::workload::{ConvWorkload, GemmWorkload, Workload};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Where the workload lives for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Footprint fits central SRAM; DRAM is never touched
    CentralResident,
    /// Footprint overflows central SRAM and streams through DRAM
    DramStreamed,
}

impl std::fmt::Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Placement::CentralResident => write!(f, "central-resident"),
            Placement::DramStreamed    => write!(f, "dram-streamed"),
        }
    }
}

/// Per-tensor bytes moved over one link, before the reload multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferComponents {
    Gemm {
        a_load: u64,
        b_load: u64,
        c_load: u64,
        c_store: u64,
    },
    Conv {
        input_load: u64,
        kernel_load: u64,
        output_load: u64,
    },
}

impl TransferComponents {
    pub fn total(&self) -> Result<u64> {
        match *self {
            TransferComponents::Gemm { a_load, b_load, c_load, c_store } => {
                checked_sum(&[a_load, b_load, c_load, c_store], "GEMM transfer volume")
            }
            TransferComponents::Conv { input_load, kernel_load, output_load } => {
                checked_sum(&[input_load, kernel_load, output_load], "conv transfer volume")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficBreakdown {
    pub placement: Placement,
    pub components: TransferComponents,
    /// Tiling-aware volume of one pass over the local link
    pub local_transfer_bytes: u64,
    /// Zero when the workload is central-resident
    pub dram_to_central_bytes: u64,
    /// `local_transfer_bytes · reload`, kept fractional
    pub central_to_local_bytes: f64,
    pub working_set_bytes: u64,
    pub reload: f64,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Compute the traffic of one workload point.
///
/// `footprint` must be the footprint of `workload`.
pub fn compute(
    workload: &Workload,
    footprint: &MemoryFootprint,
    hw: &HardwareProfile,
) -> Result<TrafficBreakdown> {
    hw.check()?;
    workload.validate()?;

    let (components, working_set_bytes) = match (workload, footprint.tensors) {
        (Workload::Gemm(g), TensorBytes::Gemm { a, .. }) => {
            (gemm_components(g, a)?, gemm_working_set(g, footprint)?)
        }
        (Workload::Conv(c), TensorBytes::Conv { input, kernel, output }) => {
            (conv_components(c, input, kernel, output)?, conv_working_set(c, footprint)?)
        }
        _ => {
            return Err(ModelError::InvalidWorkload(format!(
                "{} workload paired with a footprint of another kind",
                workload.operation()
            )));
        }
    };

    let local_transfer_bytes = components.total()?;

    let placement = if footprint.total_bytes <= hw.central_capacity_bytes {
        Placement::CentralResident
    } else {
        Placement::DramStreamed
    };
    let dram_to_central_bytes = match placement {
        Placement::CentralResident => 0,
        Placement::DramStreamed => local_transfer_bytes,
    };

    let reload = reload_multiplier(working_set_bytes, hw.local_capacity_bytes);
    let central_to_local_bytes = local_transfer_bytes as f64 * reload;

    Ok(TrafficBreakdown {
        placement,
        components,
        local_transfer_bytes,
        dram_to_central_bytes,
        central_to_local_bytes,
        working_set_bytes,
        reload,
    })
}

/// `max(1, working_set / capacity)`, never rounded.
pub fn reload_multiplier(working_set_bytes: u64, local_capacity_bytes: u64) -> f64 {
    (working_set_bytes as f64 / local_capacity_bytes as f64).max(1.0)
}

/// Number of tiles along one axis, never below one.
fn tile_count(extent: u64, tile: u64) -> u64 {
    extent.div_ceil(tile).max(1)
}

fn gemm_components(gemm: &GemmWorkload, per_matrix: u64) -> Result<TransferComponents> {
    let per_operand = match gemm.tile_side {
        Some(t) => {
            // Each operand tile is loaded once per reduction strip
            let tiles = tile_count(gemm.dimension, t);
            let per_tile = checked_product(&[t, t, gemm.element_size_bytes], "GEMM tile bytes")?;
            checked_product(&[per_tile, tiles, tiles], "GEMM tiled operand bytes")?
        }
        None => per_matrix,
    };
    Ok(TransferComponents::Gemm {
        a_load: per_operand,
        b_load: per_operand,
        c_load: per_operand,
        c_store: per_operand,
    })
}

fn gemm_working_set(gemm: &GemmWorkload, footprint: &MemoryFootprint) -> Result<u64> {
    match gemm.tile_side {
        // A and B tiles plus the C accumulator tile
        Some(t) => checked_product(&[3, t, t, gemm.element_size_bytes], "GEMM working set"),
        None => Ok(footprint.total_bytes),
    }
}

fn conv_components(
    conv: &ConvWorkload,
    input_bytes: u64,
    kernel_bytes: u64,
    output_bytes: u64,
) -> Result<TransferComponents> {
    match conv.tile_shape {
        Some(tile) => {
            let tiles_h = tile_count(conv.input_side, tile.height);
            let tiles_w = tile_count(conv.input_side, tile.width);
            let tiles = checked_product(&[tiles_h, tiles_w], "conv tile count")?;
            let effective_tile_bytes = input_bytes / tiles;
            // Halo: neighbouring tiles re-read kernel_side - 1 extra rows of input
            let halo_factor = 1 + (conv.kernel_side - 1);
            let input_load = checked_product(
                &[effective_tile_bytes, tiles, halo_factor],
                "conv tiled input load",
            )?;
            Ok(TransferComponents::Conv {
                input_load,
                kernel_load: kernel_bytes,
                output_load: output_bytes,
            })
        }
        None => {
            // Sliding window: every input element is revisited once per kernel tap
            let input_load = checked_product(
                &[input_bytes, conv.kernel_side, conv.kernel_side],
                "conv input load",
            )?;
            let output_load = checked_product(&[output_bytes, 2], "conv output load")?;
            Ok(TransferComponents::Conv {
                input_load,
                kernel_load: kernel_bytes,
                output_load,
            })
        }
    }
}

fn conv_working_set(conv: &ConvWorkload, footprint: &MemoryFootprint) -> Result<u64> {
    match conv.tile_shape {
        Some(tile) => {
            let tile_bytes = checked_product(
                &[tile.height, tile.width, conv.channels, conv.element_size_bytes],
                "conv working set",
            )?;
            Ok(tile_bytes.min(footprint.total_bytes))
        }
        None => Ok(footprint.total_bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::KIB;

    #[test]
    fn zero_central_capacity_is_rejected_not_streamed() {
        let hw = HardwareProfile::cgra_default().with_capacities(32 * crate::memory::MIB, 0, 32 * KIB);
        let gemm: Workload = GemmWorkload::new(16, 4).into();
        let fp = MemoryFootprint::of(&gemm).unwrap();
        assert!(matches!(compute(&gemm, &fp, &hw), Err(ModelError::InvalidConfiguration(_))));
    }

    fn traffic_of(workload: Workload, hw: &HardwareProfile) -> TrafficBreakdown {
        let fp = MemoryFootprint::of(&workload).unwrap();
        compute(&workload, &fp, hw).unwrap()
    }

    #[test]
    fn small_gemm_stays_in_central_sram() {
        let hw = HardwareProfile::cgra_default();
        let t = traffic_of(GemmWorkload::new(16, 4).into(), &hw);
        assert_eq!(t.placement, Placement::CentralResident);
        assert_eq!(t.dram_to_central_bytes, 0);
        assert_eq!(t.local_transfer_bytes, 4096);
        assert_eq!(t.working_set_bytes, 3072);
        assert_eq!(t.reload, 1.0);
        assert_eq!(t.central_to_local_bytes, 4096.0);
    }

    #[test]
    fn large_gemm_streams_through_dram_with_fractional_reload() {
        let hw = HardwareProfile::cgra_default();
        let t = traffic_of(GemmWorkload::new(256, 4).into(), &hw);
        assert_eq!(t.placement, Placement::DramStreamed);
        assert_eq!(t.dram_to_central_bytes, 1_048_576);
        assert_eq!(t.reload, 24.0);
        assert_eq!(t.central_to_local_bytes, 25_165_824.0);

        // 100x100 floats: 120000 / 32768 is not a whole number
        let t = traffic_of(GemmWorkload::new(100, 4).into(), &hw);
        assert_eq!(t.reload, 120_000.0 / 32_768.0);
        assert_eq!(t.central_to_local_bytes, 160_000.0 * (120_000.0 / 32_768.0));
    }

    #[test]
    fn tiled_gemm_counts_tiles_per_strip() {
        let hw = HardwareProfile::cgra_default();
        // 64 / 16 = 4 tiles per axis, 1 KiB per tile
        let t = traffic_of(GemmWorkload::new(64, 4).with_tile_side(16).into(), &hw);
        assert_eq!(
            t.components,
            TransferComponents::Gemm {
                a_load: 16 * KIB,
                b_load: 16 * KIB,
                c_load: 16 * KIB,
                c_store: 16 * KIB,
            }
        );
        assert_eq!(t.working_set_bytes, 3 * 16 * 16 * 4);
        assert_eq!(t.reload, 1.0);
    }

    #[test]
    fn tiled_gemm_with_ragged_edge_rounds_tile_count_up() {
        let hw = HardwareProfile::cgra_default();
        // ceil(50 / 16) = 4 tiles per axis
        let t = traffic_of(GemmWorkload::new(50, 4).with_tile_side(16).into(), &hw);
        assert_eq!(t.local_transfer_bytes, 4 * (16 * 16 * 4) * 4 * 4);
    }

    #[test]
    fn tile_larger_than_matrix_clamps_to_one_tile() {
        let hw = HardwareProfile::cgra_default();
        let t = traffic_of(GemmWorkload::new(16, 4).with_tile_side(32).into(), &hw);
        assert_eq!(t.local_transfer_bytes, 4 * 32 * 32 * 4);
        assert_eq!(t.working_set_bytes, 3 * 32 * 32 * 4);
        assert_eq!(t.reload, 1.0);
    }

    #[test]
    fn untiled_conv_uses_sliding_window_reuse() {
        let hw = HardwareProfile::cgra_default();
        let conv = ConvWorkload::new(32, 3).with_channels(2, 4);
        let t = traffic_of(conv.into(), &hw);
        let input = 32 * 32 * 2 * 4;
        let kernel = 3 * 3 * 2 * 4 * 4;
        let output = 30 * 30 * 4 * 4;
        assert_eq!(
            t.components,
            TransferComponents::Conv {
                input_load: input * 9,
                kernel_load: kernel,
                output_load: 2 * output,
            }
        );
        assert_eq!(t.dram_to_central_bytes, 0);
        // footprint 8192 + 288 + 14400 = 22880 fits local SRAM
        assert_eq!(t.reload, 1.0);
    }

    #[test]
    fn tiled_conv_applies_halo_factor() {
        let hw = HardwareProfile::cgra_default();
        let conv = ConvWorkload::new(64, 3).with_tile_shape(32, 16);
        let t = traffic_of(conv.into(), &hw);
        let input = 64 * 64 * 4;
        // 2 x 4 tiles, each 2 KiB, re-read 3 times
        assert_eq!(
            t.components,
            TransferComponents::Conv {
                input_load: (input / 8) * 8 * 3,
                kernel_load: 9 * 4,
                output_load: 62 * 62 * 4,
            }
        );
        assert_eq!(t.working_set_bytes, 32 * 16 * 4);
    }

    #[test]
    fn tiled_conv_floors_effective_tile_bytes() {
        let hw = HardwareProfile::cgra_default();
        // 10x10x1 input = 400 bytes over 3x3 tiles: floor(400 / 9) = 44
        let conv = ConvWorkload::new(10, 1).with_tile_shape(4, 4);
        let t = traffic_of(conv.into(), &hw);
        match t.components {
            TransferComponents::Conv { input_load, .. } => assert_eq!(input_load, 44 * 9),
            other => panic!("unexpected components {other:?}"),
        }
    }

    #[test]
    fn conv_working_set_never_exceeds_footprint() {
        let hw = HardwareProfile::cgra_default();
        let conv = ConvWorkload::new(8, 3).with_tile_shape(256, 256);
        let fp = MemoryFootprint::of(&conv.into()).unwrap();
        let t = compute(&conv.into(), &fp, &hw).unwrap();
        assert_eq!(t.working_set_bytes, fp.total_bytes);
    }

    #[test]
    fn conv_working_set_beyond_local_capacity_reloads() {
        let hw = HardwareProfile::cgra_default();
        // 64x64 tile with 4 channels = 64 KiB, twice the local SRAM
        let conv = ConvWorkload::new(128, 3).with_channels(4, 1).with_tile_shape(64, 64);
        let t = traffic_of(conv.into(), &hw);
        assert_eq!(t.working_set_bytes, 64 * KIB);
        assert_eq!(t.reload, 2.0);
        assert_eq!(t.central_to_local_bytes, t.local_transfer_bytes as f64 * 2.0);
    }

    #[test]
    fn zero_tile_is_a_configuration_error() {
        let hw = HardwareProfile::cgra_default();
        let w: Workload = GemmWorkload::new(64, 4).with_tile_side(0).into();
        let fp = MemoryFootprint::of(&w).unwrap();
        assert!(matches!(compute(&w, &fp, &hw), Err(ModelError::InvalidConfiguration(_))));
    }

    #[test]
    fn mismatched_footprint_is_rejected() {
        let hw = HardwareProfile::cgra_default();
        let gemm: Workload = GemmWorkload::new(16, 4).into();
        let conv_fp = MemoryFootprint::of(&ConvWorkload::new(16, 3).into()).unwrap();
        assert!(matches!(compute(&gemm, &conv_fp, &hw), Err(ModelError::InvalidWorkload(_))));
    }

    #[test]
    fn reload_multiplier_is_at_least_one() {
        assert_eq!(reload_multiplier(0, 1024), 1.0);
        assert_eq!(reload_multiplier(1024, 1024), 1.0);
        assert_eq!(reload_multiplier(1536, 1024), 1.5);
    }
}
