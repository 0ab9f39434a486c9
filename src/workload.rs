//! Workload definitions.
//! A workload point is one GEMM or one 2D convolution with a fixed shape and
//! an optional tiling policy. Points are cheap `Copy` values; the sweep driver
//! builds one per analyzed configuration.
use crate::error::{ModelError, Result};
use crate::footprint::MemoryFootprint;
use crate::latency::{self, LatencyBreakdown};
use crate::memory::HardwareProfile;
use crate::traffic::{self, TrafficBreakdown};
use serde::{Deserialize, Serialize};

/// Which kind of tensor operation a sweep analyzes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Gemm,
    Conv,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Gemm => write!(f, "GEMM"),
            Operation::Conv => write!(f, "Conv"),
        }
    }
}

// ---------------------------------------------------------------------------
// GEMM
// ---------------------------------------------------------------------------

/// Square matrix multiplication C = A · B with `dimension × dimension` operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GemmWorkload {
    /// Side of every square operand
    pub dimension: u64,
    pub element_size_bytes: u64,
    /// Square tile side, `None` for an untiled schedule
    pub tile_side: Option<u64>,
}

impl GemmWorkload {
    pub fn new(dimension: u64, element_size_bytes: u64) -> Self {
        GemmWorkload {
            dimension,
            element_size_bytes,
            tile_side: None,
        }
    }

    pub fn with_tile_side(mut self, tile_side: u64) -> Self {
        self.tile_side = Some(tile_side);
        self
    }

    /// Shape checks only; tiling is checked by [`GemmWorkload::validate`].
    pub fn validate_shape(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(ModelError::InvalidWorkload("GEMM dimension must be positive".into()));
        }
        if self.element_size_bytes == 0 {
            return Err(ModelError::InvalidWorkload("element size must be positive".into()));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_shape()?;
        if self.tile_side == Some(0) {
            return Err(ModelError::InvalidConfiguration("GEMM tile side must be positive".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Convolution
// ---------------------------------------------------------------------------

/// Spatial tile of the convolution input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileShape {
    pub height: u64,
    pub width: u64,
}

impl TileShape {
    pub fn new(height: u64, width: u64) -> Self {
        TileShape { height, width }
    }
}

/// Square 2D convolution over a `input_side × input_side × channels` input
/// with `filters` square kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvWorkload {
    pub input_side: u64,
    pub kernel_side: u64,
    pub channels: u64,
    pub filters: u64,
    pub element_size_bytes: u64,
    pub padding: u64,
    pub stride: u64,
    /// Carried for reporting; the traffic model assumes dense kernels
    pub dilation: u64,
    /// Carried for reporting; the traffic model assumes a single group
    pub groups: u64,
    pub tile_shape: Option<TileShape>,
}

impl ConvWorkload {
    /// Single-channel, single-filter, 4-byte, unpadded, unit-stride convolution.
    pub fn new(input_side: u64, kernel_side: u64) -> Self {
        ConvWorkload {
            input_side,
            kernel_side,
            channels: 1,
            filters: 1,
            element_size_bytes: 4,
            padding: 0,
            stride: 1,
            dilation: 1,
            groups: 1,
            tile_shape: None,
        }
    }

    pub fn with_channels(mut self, channels: u64, filters: u64) -> Self {
        self.channels = channels;
        self.filters = filters;
        self
    }

    pub fn with_element_size(mut self, element_size_bytes: u64) -> Self {
        self.element_size_bytes = element_size_bytes;
        self
    }

    pub fn with_padding(mut self, padding: u64) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_stride(mut self, stride: u64) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_dilation(mut self, dilation: u64) -> Self {
        self.dilation = dilation;
        self
    }

    pub fn with_groups(mut self, groups: u64) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_tile_shape(mut self, height: u64, width: u64) -> Self {
        self.tile_shape = Some(TileShape::new(height, width));
        self
    }

    /// `floor((input_side + 2·padding − kernel_side) / stride) + 1`.
    /// Fails when the kernel does not fit the padded input.
    pub fn output_side(&self) -> Result<u64> {
        self.validate_fields()?;
        let padded = self
            .padding
            .checked_mul(2)
            .and_then(|p| p.checked_add(self.input_side))
            .ok_or(ModelError::ArithmeticOverflow("padded input side"))?;
        if padded < self.kernel_side {
            return Err(ModelError::InvalidWorkload(format!(
                "kernel side {} exceeds padded input side {}",
                self.kernel_side, padded
            )));
        }
        Ok((padded - self.kernel_side) / self.stride + 1)
    }

    fn validate_fields(&self) -> Result<()> {
        let positive = [
            ("input side", self.input_side),
            ("kernel side", self.kernel_side),
            ("channels", self.channels),
            ("filters", self.filters),
            ("element size", self.element_size_bytes),
            ("stride", self.stride),
            ("dilation", self.dilation),
            ("groups", self.groups),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ModelError::InvalidWorkload(format!("conv {name} must be positive")));
            }
        }
        Ok(())
    }

    /// Shape checks only, including the derived output side.
    pub fn validate_shape(&self) -> Result<()> {
        self.output_side().map(|_| ())
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_shape()?;
        if let Some(tile) = self.tile_shape {
            if tile.height == 0 || tile.width == 0 {
                return Err(ModelError::InvalidConfiguration(format!(
                    "conv tile shape {}x{} has a zero dimension",
                    tile.height, tile.width
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Workload
// ---------------------------------------------------------------------------

/// One analyzed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Workload {
    Gemm(GemmWorkload),
    Conv(ConvWorkload),
}

impl Workload {
    pub fn operation(&self) -> Operation {
        match self {
            Workload::Gemm(_) => Operation::Gemm,
            Workload::Conv(_) => Operation::Conv,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Workload::Gemm(g) => g.validate(),
            Workload::Conv(c) => c.validate(),
        }
    }

    pub fn is_tiled(&self) -> bool {
        match self {
            Workload::Gemm(g) => g.tile_side.is_some(),
            Workload::Conv(c) => c.tile_shape.is_some(),
        }
    }

    pub fn footprint(&self) -> Result<MemoryFootprint> {
        MemoryFootprint::of(self)
    }

    pub fn traffic(
        &self,
        footprint: &MemoryFootprint,
        hw: &HardwareProfile,
    ) -> Result<TrafficBreakdown> {
        traffic::compute(self, footprint, hw)
    }

    pub fn latency(&self, traffic: &TrafficBreakdown, hw: &HardwareProfile) -> Result<LatencyBreakdown> {
        latency::estimate(self, traffic, hw)
    }

    /// Short row label for reports, e.g. `256` or `64x64 k3`.
    pub fn label(&self) -> String {
        match self {
            Workload::Gemm(g) => g.dimension.to_string(),
            Workload::Conv(c) => format!("{0}x{0} k{1}", c.input_side, c.kernel_side),
        }
    }
}

impl From<GemmWorkload> for Workload {
    fn from(g: GemmWorkload) -> Self {
        Workload::Gemm(g)
    }
}

impl From<ConvWorkload> for Workload {
    fn from(c: ConvWorkload) -> Self {
        Workload::Conv(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_side_follows_padding_and_stride() {
        assert_eq!(ConvWorkload::new(32, 3).output_side(), Ok(30));
        assert_eq!(ConvWorkload::new(32, 3).with_padding(1).output_side(), Ok(32));
        assert_eq!(ConvWorkload::new(32, 3).with_stride(2).output_side(), Ok(15));
        assert_eq!(ConvWorkload::new(5, 5).output_side(), Ok(1));
    }

    #[test]
    fn kernel_larger_than_padded_input_is_invalid() {
        let err = ConvWorkload::new(4, 7).with_padding(1).output_side().unwrap_err();
        assert!(matches!(err, ModelError::InvalidWorkload(_)));
        assert!(ConvWorkload::new(4, 6).with_padding(1).output_side().is_ok());
    }

    #[test]
    fn zero_stride_and_zero_shape_are_invalid_workloads() {
        let bad = [
            ConvWorkload::new(32, 3).with_stride(0),
            ConvWorkload::new(0, 3),
            ConvWorkload::new(32, 3).with_channels(0, 1),
            ConvWorkload::new(32, 3).with_element_size(0),
        ];
        for conv in bad {
            assert!(matches!(conv.validate(), Err(ModelError::InvalidWorkload(_))), "{conv:?}");
        }
        assert!(matches!(
            GemmWorkload::new(0, 4).validate(),
            Err(ModelError::InvalidWorkload(_))
        ));
    }

    #[test]
    fn zero_tiles_are_configuration_errors() {
        assert!(matches!(
            GemmWorkload::new(64, 4).with_tile_side(0).validate(),
            Err(ModelError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ConvWorkload::new(64, 3).with_tile_shape(16, 0).validate(),
            Err(ModelError::InvalidConfiguration(_))
        ));
        // Shape validation alone ignores tiling
        assert!(GemmWorkload::new(64, 4).with_tile_side(0).validate_shape().is_ok());
    }

    #[test]
    fn tile_larger_than_dimension_is_accepted() {
        assert!(GemmWorkload::new(16, 4).with_tile_side(32).validate().is_ok());
    }

    #[test]
    fn workload_serializes_with_kind_tag() {
        let w: Workload = GemmWorkload::new(16, 4).into();
        let json = serde_json::to_value(w).unwrap();
        assert_eq!(json["kind"], "gemm");
        assert_eq!(json["dimension"], 16);
        assert_eq!(serde_json::from_value::<Workload>(json).unwrap(), w);
    }

    #[test]
    fn labels() {
        assert_eq!(Workload::from(GemmWorkload::new(256, 4)).label(), "256");
        assert_eq!(Workload::from(ConvWorkload::new(64, 3)).label(), "64x64 k3");
    }
}
