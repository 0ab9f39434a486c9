//! Sweep driver.
//! Evaluates workload points one at a time against a shared hardware profile
//! and collects one record per point, in input order.
use crate::error::{ModelError, Result};
use crate::footprint::MemoryFootprint;
use crate::latency::{LatencyBreakdown, TimeBreakdown};
use crate::memory::HardwareProfile;
use crate::traffic::TrafficBreakdown;
use crate::utilization::UtilizationBreakdown;
use crate::workload::{Operation, Workload};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Everything the model derives for one workload point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub workload: Workload,
    pub footprint: MemoryFootprint,
    pub traffic: TrafficBreakdown,
    pub latency: LatencyBreakdown,
    pub utilization: UtilizationBreakdown,
}

impl AnalysisRecord {
    pub fn time(&self, hw: &HardwareProfile) -> TimeBreakdown {
        self.latency.to_seconds(hw)
    }
}

/// Run the full model on one point.
pub fn analyze(workload: &Workload, hw: &HardwareProfile) -> Result<AnalysisRecord> {
    hw.check()?;
    let footprint = workload.footprint()?;
    let traffic = workload.traffic(&footprint, hw)?;
    let latency = workload.latency(&traffic, hw)?;
    let utilization = UtilizationBreakdown::compute(footprint.total_bytes, hw);
    Ok(AnalysisRecord {
        workload: *workload,
        footprint,
        traffic,
        latency,
        utilization,
    })
}

// ---------------------------------------------------------------------------
// Sweeps
// ---------------------------------------------------------------------------

/// What to do when one point of a sweep is malformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing point
    #[default]
    Abort,
    /// Record the failure and keep going
    Skip,
}

/// A point dropped under [`FailurePolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPoint {
    /// Position in the input sequence
    pub index: usize,
    pub workload: Workload,
    pub error: String,
}

/// Ordered sweep output handed to reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub operation: Operation,
    pub hardware: HardwareProfile,
    pub records: Vec<AnalysisRecord>,
    #[serde(default)]
    pub skipped: Vec<SkippedPoint>,
}

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("hardware profile rejected: {0}")]
    Hardware(#[source] ModelError),

    #[error("point {index} ({label}) failed: {source}")]
    Point {
        index: usize,
        label: String,
        #[source]
        source: ModelError,
    },
}

/// Evaluate `points` in order.
///
/// Every point must be of kind `operation`; a mismatched point fails like a
/// malformed one.
pub fn run_sweep(
    operation: Operation,
    points: &[Workload],
    hw: &HardwareProfile,
    policy: FailurePolicy,
) -> std::result::Result<SweepReport, SweepError> {
    let hardware = hw.clone().validate().map_err(SweepError::Hardware)?;

    info!(%operation, points = points.len(), ?policy, "starting sweep");

    let mut records = Vec::with_capacity(points.len());
    let mut skipped = Vec::new();

    for (index, workload) in points.iter().enumerate() {
        let outcome = if workload.operation() == operation {
            analyze(workload, &hardware)
        } else {
            Err(ModelError::InvalidWorkload(format!(
                "{} point in a {} sweep",
                workload.operation(),
                operation
            )))
        };

        match outcome {
            Ok(record) => {
                debug!(
                    index,
                    point = %workload.label(),
                    footprint = record.footprint.total_bytes,
                    placement = %record.traffic.placement,
                    reload = record.traffic.reload,
                    total_cycles = record.latency.total_cycles,
                    "analyzed point"
                );
                records.push(record);
            }
            Err(source) => match policy {
                FailurePolicy::Abort => {
                    return Err(SweepError::Point {
                        index,
                        label: workload.label(),
                        source,
                    });
                }
                FailurePolicy::Skip => {
                    warn!(index, point = %workload.label(), error = %source, "skipping point");
                    skipped.push(SkippedPoint {
                        index,
                        workload: *workload,
                        error: source.to_string(),
                    });
                }
            },
        }
    }

    info!(
        %operation,
        analyzed = records.len(),
        skipped = skipped.len(),
        "sweep complete"
    );

    Ok(SweepReport {
        operation,
        hardware,
        records,
        skipped,
    })
}
