//! Console tables and result files.
//!
//! Result files are the JSON form of a [`SweepReport`]. Writes are atomic
//! (write to .tmp then rename) so the `viz` dashboard never sees a torn file.
use crate::analysis::SweepReport;
use crate::memory::MemoryTier;
use crate::workload::Operation;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

fn point_header(operation: Operation) -> &'static str {
    match operation {
        Operation::Gemm => "Dimension",
        Operation::Conv => "Input Size",
    }
}

/// Per-point cycle counts.
pub fn render_cycle_table(report: &SweepReport) -> String {
    let mut out = String::new();
    let rule = "-".repeat(80);
    let _ = writeln!(out, "\n{} Cycle Breakdown:", report.operation);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "{:<15} {:>14} {:>14} {:>14} {:>14} {:>6}",
        point_header(report.operation),
        "DRAM-Central",
        "Central-Local",
        "Computation",
        "Total",
        "Reload"
    );
    let _ = writeln!(out, "{rule}");
    for r in &report.records {
        let l = &r.latency;
        let _ = writeln!(
            out,
            "{:<15} {:>14} {:>14} {:>14} {:>14} {:>6.2}",
            r.workload.label(),
            l.dram_to_central_cycles,
            l.central_to_local_cycles,
            l.computation_cycles,
            l.total_cycles,
            r.traffic.reload
        );
    }
    out
}

/// Per-point phase durations in seconds.
pub fn render_time_table(report: &SweepReport) -> String {
    let mut out = String::new();
    let rule = "-".repeat(70);
    let _ = writeln!(out, "\n{} Time Breakdown:", report.operation);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "{:<15} {:>12} {:>12} {:>12} {:>12}",
        point_header(report.operation),
        "DRAM-Central",
        "Central-CGRA",
        "Computation",
        "Total"
    );
    let _ = writeln!(out, "{rule}");
    for r in &report.records {
        let t = r.time(&report.hardware);
        let _ = writeln!(
            out,
            "{:<15} {:>12.6} {:>12.6} {:>12.6} {:>12.6}",
            r.workload.label(),
            t.dram_to_central_s,
            t.central_to_local_s,
            t.computation_s,
            t.total_s
        );
    }
    out
}

/// Per-point utilization of each tier, in percent.
pub fn render_utilization_table(report: &SweepReport) -> String {
    let mut out = String::new();
    let rule = "-".repeat(58);
    let _ = writeln!(out, "\n{} Memory Utilization:", report.operation);
    let _ = writeln!(out, "{rule}");
    let _ = write!(out, "{:<15}", point_header(report.operation));
    for tier in MemoryTier::ALL {
        let _ = write!(out, " {:>13}", tier.to_string());
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{rule}");
    for r in &report.records {
        let _ = write!(out, "{:<15}", r.workload.label());
        for tier in MemoryTier::ALL {
            let _ = write!(out, " {:>12.2}%", r.utilization.get(tier) * 100.0);
        }
        let _ = writeln!(out);
    }
    out
}

/// All tables, followed by any skipped points.
pub fn render(report: &SweepReport) -> String {
    let mut out = render_cycle_table(report);
    out.push_str(&render_time_table(report));
    out.push_str(&render_utilization_table(report));
    if !report.skipped.is_empty() {
        let _ = writeln!(out, "\nSkipped {} point(s):", report.skipped.len());
        for s in &report.skipped {
            let _ = writeln!(out, "  #{} {}: {}", s.index, s.workload.label(), s.error);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Result files
// ---------------------------------------------------------------------------

/// `<prefix>_<operation>_results.json`
pub fn results_path(prefix: &str, operation: Operation) -> PathBuf {
    let op = match operation {
        Operation::Gemm => "gemm",
        Operation::Conv => "conv",
    };
    PathBuf::from(format!("{prefix}_{op}_results.json"))
}

/// Atomically write `report` as pretty JSON.
pub fn write_results(report: &SweepReport, path: &Path) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(report)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, json).map_err(|source| ReportError::Io {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), records = report.records.len(), "wrote results");
    Ok(())
}

pub fn read_results(path: &Path) -> Result<SweepReport, ReportError> {
    let data = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&data)?)
}
