//! Per-tensor byte sizes of a workload point.
use crate::error::{checked_product, checked_sum, Result};
use crate::workload::{ConvWorkload, GemmWorkload, Workload};
use serde::{Deserialize, Serialize};

/// Byte size of every tensor a workload touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TensorBytes {
    /// Operands A, B and result C; all three are the same size
    Gemm { a: u64, b: u64, c: u64 },
    Conv { input: u64, kernel: u64, output: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryFootprint {
    pub tensors: TensorBytes,
    pub total_bytes: u64,
}

impl MemoryFootprint {
    pub fn of(workload: &Workload) -> Result<Self> {
        match workload {
            Workload::Gemm(g) => Self::gemm(g),
            Workload::Conv(c) => Self::conv(c),
        }
    }

    /// `per_matrix = dimension² · element_size`, total = 3 · per_matrix.
    pub fn gemm(gemm: &GemmWorkload) -> Result<Self> {
        gemm.validate_shape()?;
        let per_matrix = checked_product(
            &[gemm.dimension, gemm.dimension, gemm.element_size_bytes],
            "GEMM matrix bytes",
        )?;
        let total_bytes = checked_product(&[per_matrix, 3], "GEMM footprint")?;
        Ok(MemoryFootprint {
            tensors: TensorBytes::Gemm {
                a: per_matrix,
                b: per_matrix,
                c: per_matrix,
            },
            total_bytes,
        })
    }

    pub fn conv(conv: &ConvWorkload) -> Result<Self> {
        let output_side = conv.output_side()?;
        let e = conv.element_size_bytes;
        let input = checked_product(
            &[conv.input_side, conv.input_side, conv.channels, e],
            "conv input bytes",
        )?;
        let kernel = checked_product(
            &[conv.kernel_side, conv.kernel_side, conv.channels, conv.filters, e],
            "conv kernel bytes",
        )?;
        let output = checked_product(
            &[output_side, output_side, conv.filters, e],
            "conv output bytes",
        )?;
        let total_bytes = checked_sum(&[input, kernel, output], "conv footprint")?;
        Ok(MemoryFootprint {
            tensors: TensorBytes::Conv { input, kernel, output },
            total_bytes,
        })
    }

    /// Size of one GEMM operand; `None` for convolutions.
    pub fn per_matrix(&self) -> Option<u64> {
        match self.tensors {
            TensorBytes::Gemm { a, .. } => Some(a),
            TensorBytes::Conv { .. } => None,
        }
    }
}
