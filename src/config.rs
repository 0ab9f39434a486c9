//! YAML configuration files.
//!
//! Hardware file (sizes in MiB for DRAM and KiB for both SRAMs, clocks in MHz):
//!
//! ```yaml
//! hardware:
//!   dram:         { size: 32,  latency: 100 }
//!   central_sram: { size: 512, latency: 10 }
//!   cgra_sram:    { size: 32,  latency: 1 }
//!   dma:          { transfer_rate: 16 }
//!   bus_frequency: 100
//!   cgra_frequency: 100
//!   compute_width: 4
//! ```
//!
//! Operation files describe a sweep; see [`GemmConfig`] and [`ConvConfig`].
//! Every field is optional and falls back to the reference defaults.
use crate::error::ModelError;
use crate::memory::{HardwareProfile, KIB, MIB};
use crate::workload::{ConvWorkload, GemmWorkload, Operation, Workload};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ModelError),
}

fn read_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Hardware
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HardwareFile {
    #[serde(default)]
    pub hardware: HardwareSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TierSection {
    pub size: Option<u64>,
    pub latency: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DmaSection {
    /// Bytes per bus cycle
    pub transfer_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareSection {
    /// Size in MiB
    pub dram: TierSection,
    /// Size in KiB
    pub central_sram: TierSection,
    /// Size in KiB
    pub cgra_sram: TierSection,
    pub dma: DmaSection,
    /// Accepted for compatibility; the model prices transfers by `dma.transfer_rate`
    pub bits_per_cycle: Option<u64>,
    /// MHz
    pub bus_frequency: Option<f64>,
    /// MHz
    pub cgra_frequency: Option<f64>,
    pub compute_width: Option<u64>,
}

impl HardwareSection {
    /// Convert file units to bytes and Hz, filling gaps from
    /// [`HardwareProfile::cgra_default`], and validate.
    pub fn into_profile(self) -> Result<HardwareProfile, ModelError> {
        let base = HardwareProfile::cgra_default();
        let scaled = |size: Option<u64>, unit: u64, fallback: u64, what: &'static str| {
            match size {
                Some(s) => s.checked_mul(unit).ok_or(ModelError::ArithmeticOverflow(what)),
                None => Ok(fallback),
            }
        };

        let dram = scaled(self.dram.size, MIB, base.dram_capacity_bytes, "DRAM capacity")?;
        let central = scaled(
            self.central_sram.size,
            KIB,
            base.central_capacity_bytes,
            "central SRAM capacity",
        )?;
        let local = scaled(self.cgra_sram.size, KIB, base.local_capacity_bytes, "local SRAM capacity")?;

        let bus_hz = self.bus_frequency.map_or(base.bus_frequency_hz, |mhz| mhz * 1e6);
        let compute_hz = self.cgra_frequency.map_or(base.compute_frequency_hz, |mhz| mhz * 1e6);

        base.clone()
            .with_capacities(dram, central, local)
            .with_latencies(
                self.dram.latency.unwrap_or(base.dram_latency_cycles),
                self.central_sram.latency.unwrap_or(base.central_latency_cycles),
                self.cgra_sram.latency.unwrap_or(base.local_latency_cycles),
            )
            .with_dma_bytes_per_cycle(self.dma.transfer_rate.unwrap_or(base.dma_bytes_per_cycle))
            .with_frequencies(bus_hz, compute_hz)
            .with_compute_width(self.compute_width.unwrap_or(base.compute_width))
            .validate()
    }
}

pub fn parse_hardware(yaml: &str) -> Result<HardwareProfile, ConfigError> {
    let file: HardwareFile = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
        path: PathBuf::from("<inline>"),
        source,
    })?;
    Ok(file.hardware.into_profile()?)
}

pub fn load_hardware(path: &Path) -> Result<HardwareProfile, ConfigError> {
    let file: HardwareFile = read_yaml(path)?;
    let profile = file.hardware.into_profile()?;
    info!(
        path = %path.display(),
        dram = profile.dram_capacity_bytes,
        central = profile.central_capacity_bytes,
        local = profile.local_capacity_bytes,
        "loaded hardware profile"
    );
    Ok(profile)
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Output options shared by both operation files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    pub output_prefix: String,
    pub save_detailed_results: bool,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        AnalysisSection {
            output_prefix: "tilesim".to_string(),
            save_detailed_results: false,
        }
    }
}

/// GEMM sweep: one point per entry of `dimensions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GemmConfig {
    pub dimensions: Vec<u64>,
    /// Bytes per element
    pub data_type_size: u64,
    pub tiling_size: Option<u64>,
    pub analysis: AnalysisSection,
}

impl Default for GemmConfig {
    fn default() -> Self {
        GemmConfig {
            dimensions: vec![16, 32, 64, 128, 256],
            data_type_size: 4,
            tiling_size: None,
            analysis: AnalysisSection::default(),
        }
    }
}

impl GemmConfig {
    pub fn points(&self) -> Vec<Workload> {
        self.dimensions
            .iter()
            .map(|&dim| -> Workload {
                let gemm = GemmWorkload::new(dim, self.data_type_size);
                match self.tiling_size {
                    Some(t) => gemm.with_tile_side(t).into(),
                    None => gemm.into(),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilingSection {
    pub enabled: bool,
    /// `[height, width]`
    pub input_tile_size: [u64; 2],
}

impl Default for TilingSection {
    fn default() -> Self {
        TilingSection {
            enabled: false,
            input_tile_size: [32, 32],
        }
    }
}

/// Data layout hints. Informational only; the model is layout-agnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryPatternSection {
    pub input_layout: String,
    pub kernel_layout: String,
    pub vectorization: u64,
}

impl Default for MemoryPatternSection {
    fn default() -> Self {
        MemoryPatternSection {
            input_layout: "NCHW".to_string(),
            kernel_layout: "KCRS".to_string(),
            vectorization: 4,
        }
    }
}

/// Convolution sweep: the product of `input_dimensions` (outer) and
/// `kernel_sizes` (inner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvConfig {
    pub input_dimensions: Vec<u64>,
    pub kernel_sizes: Vec<u64>,
    pub num_channels: u64,
    pub num_filters: u64,
    pub data_type_size: u64,
    pub padding: u64,
    pub stride: u64,
    pub dilation: u64,
    pub groups: u64,
    pub tiling: TilingSection,
    pub memory_pattern: MemoryPatternSection,
    pub analysis: AnalysisSection,
}

impl Default for ConvConfig {
    fn default() -> Self {
        ConvConfig {
            input_dimensions: vec![16, 32, 64, 128],
            kernel_sizes: vec![3],
            num_channels: 1,
            num_filters: 1,
            data_type_size: 4,
            padding: 0,
            stride: 1,
            dilation: 1,
            groups: 1,
            tiling: TilingSection::default(),
            memory_pattern: MemoryPatternSection::default(),
            analysis: AnalysisSection::default(),
        }
    }
}

impl ConvConfig {
    pub fn points(&self) -> Vec<Workload> {
        let mut points = Vec::with_capacity(self.input_dimensions.len() * self.kernel_sizes.len());
        for &dim in &self.input_dimensions {
            for &kernel in &self.kernel_sizes {
                let mut conv = ConvWorkload::new(dim, kernel)
                    .with_channels(self.num_channels, self.num_filters)
                    .with_element_size(self.data_type_size)
                    .with_padding(self.padding)
                    .with_stride(self.stride)
                    .with_dilation(self.dilation)
                    .with_groups(self.groups);
                if self.tiling.enabled {
                    let [h, w] = self.tiling.input_tile_size;
                    conv = conv.with_tile_shape(h, w);
                }
                points.push(conv.into());
            }
        }
        points
    }
}

/// A parsed operation file.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationConfig {
    Gemm(GemmConfig),
    Conv(ConvConfig),
}

impl OperationConfig {
    pub fn points(&self) -> Vec<Workload> {
        match self {
            OperationConfig::Gemm(c) => c.points(),
            OperationConfig::Conv(c) => c.points(),
        }
    }

    pub fn analysis(&self) -> &AnalysisSection {
        match self {
            OperationConfig::Gemm(c) => &c.analysis,
            OperationConfig::Conv(c) => &c.analysis,
        }
    }

    pub fn analysis_mut(&mut self) -> &mut AnalysisSection {
        match self {
            OperationConfig::Gemm(c) => &mut c.analysis,
            OperationConfig::Conv(c) => &mut c.analysis,
        }
    }
}

pub fn parse_operation(operation: Operation, yaml: &str) -> Result<OperationConfig, ConfigError> {
    let yaml_err = |source: serde_yaml::Error| ConfigError::Yaml {
        path: PathBuf::from("<inline>"),
        source,
    };
    Ok(match operation {
        Operation::Gemm => OperationConfig::Gemm(serde_yaml::from_str(yaml).map_err(yaml_err)?),
        Operation::Conv => OperationConfig::Conv(serde_yaml::from_str(yaml).map_err(yaml_err)?),
    })
}

pub fn load_operation(operation: Operation, path: &Path) -> Result<OperationConfig, ConfigError> {
    let config = match operation {
        Operation::Gemm => OperationConfig::Gemm(read_yaml(path)?),
        Operation::Conv => OperationConfig::Conv(read_yaml(path)?),
    };
    info!(
        path = %path.display(),
        %operation,
        points = config.points().len(),
        "loaded sweep configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hardware_file_is_reference_profile() {
        assert_eq!(parse_hardware("{}").unwrap(), HardwareProfile::cgra_default());
    }

    #[test]
    fn hardware_units_are_scaled() {
        let yaml = "
hardware:
  dram: { size: 64, latency: 200 }
  central_sram: { size: 256 }
  cgra_sram: { size: 16, latency: 2 }
  dma: { transfer_rate: 32 }
  bits_per_cycle: 128
  bus_frequency: 200
  cgra_frequency: 400
";
        let hw = parse_hardware(yaml).unwrap();
        assert_eq!(hw.dram_capacity_bytes, 64 * MIB);
        assert_eq!(hw.central_capacity_bytes, 256 * KIB);
        assert_eq!(hw.local_capacity_bytes, 16 * KIB);
        assert_eq!(hw.dram_latency_cycles, 200);
        assert_eq!(hw.central_latency_cycles, 10);
        assert_eq!(hw.local_latency_cycles, 2);
        assert_eq!(hw.dma_bytes_per_cycle, 32.0);
        assert_eq!(hw.bus_frequency_hz, 200e6);
        assert_eq!(hw.compute_frequency_hz, 400e6);
        assert_eq!(hw.compute_width, 4);
    }

    #[test]
    fn zero_sized_sram_is_invalid() {
        let err = parse_hardware("hardware: { cgra_sram: { size: 0 } }").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ModelError::InvalidConfiguration(_))));
    }

    #[test]
    fn malformed_yaml_is_reported() {
        assert!(matches!(parse_hardware("hardware: [1, 2"), Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn gemm_defaults_and_tiling() {
        let cfg = parse_operation(Operation::Gemm, "tiling_size: 16").unwrap();
        let points = cfg.points();
        assert_eq!(points.len(), 5);
        assert_eq!(
            points[0],
            Workload::Gemm(GemmWorkload::new(16, 4).with_tile_side(16))
        );
        assert_eq!(cfg.analysis(), &AnalysisSection::default());
    }

    #[test]
    fn conv_points_are_dimension_major() {
        let yaml = "
input_dimensions: [16, 32]
kernel_sizes: [1, 3]
num_channels: 3
num_filters: 8
padding: 1
tiling: { enabled: true, input_tile_size: [8, 4] }
analysis: { output_prefix: out/conv, save_detailed_results: true }
";
        let cfg = parse_operation(Operation::Conv, yaml).unwrap();
        let labels: Vec<String> = cfg.points().iter().map(Workload::label).collect();
        assert_eq!(labels, ["16x16 k1", "16x16 k3", "32x32 k1", "32x32 k3"]);
        match cfg.points()[3] {
            Workload::Conv(c) => {
                assert_eq!((c.channels, c.filters, c.padding), (3, 8, 1));
                assert_eq!(c.tile_shape.map(|t| (t.height, t.width)), Some((8, 4)));
            }
            other => panic!("unexpected point {other:?}"),
        }
        assert_eq!(cfg.analysis().output_prefix, "out/conv");
        assert!(cfg.analysis().save_detailed_results);
    }

    #[test]
    fn disabled_tiling_ignores_tile_size() {
        let cfg = parse_operation(
            Operation::Conv,
            "tiling: { enabled: false, input_tile_size: [8, 8] }",
        )
        .unwrap();
        assert!(cfg.points().iter().all(|p| !p.is_tiled()));
    }
}
