use std::path::PathBuf;

use tilesim::analysis::{run_sweep, FailurePolicy};
use tilesim::config::{load_hardware, load_operation, ConfigError};
use tilesim::memory::HardwareProfile;
use tilesim::report::{read_results, render, results_path, write_results};
use tilesim::workload::Operation;

fn config_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs").join(name)
}

#[test]
fn shipped_hardware_file_is_reference_profile() {
    let hw = load_hardware(&config_path("hardware_config.yaml")).unwrap();
    assert_eq!(hw, HardwareProfile::cgra_default());
}

#[test]
fn shipped_gemm_sweep_runs_end_to_end() {
    let hw = load_hardware(&config_path("hardware_config.yaml")).unwrap();
    let op = load_operation(Operation::Gemm, &config_path("gemm_config.yaml")).unwrap();
    let report = run_sweep(Operation::Gemm, &op.points(), &hw, FailurePolicy::Abort).unwrap();

    let totals: Vec<u64> = report.records.iter().map(|r| r.latency.total_cycles).collect();
    assert_eq!(totals.len(), 5);
    assert_eq!(totals[0], 2304);
    assert_eq!(totals[4], 10_027_008);
    assert!(totals.windows(2).all(|w| w[0] < w[1]));

    let text = render(&report);
    assert!(text.contains("GEMM Time Breakdown:"));
    assert!(text.contains("GEMM Memory Utilization:"));
}

#[test]
fn shipped_conv_sweep_writes_results() {
    let hw = load_hardware(&config_path("hardware_config.yaml")).unwrap();
    let op = load_operation(Operation::Conv, &config_path("conv_config.yaml")).unwrap();
    let report = run_sweep(Operation::Conv, &op.points(), &hw, FailurePolicy::Abort).unwrap();
    assert_eq!(report.records.len(), 8);

    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("run");
    let path = results_path(prefix.to_str().unwrap(), Operation::Conv);
    write_results(&report, &path).unwrap();
    assert!(path.ends_with("run_conv_results.json"));
    assert_eq!(read_results(&path).unwrap(), report);
}

#[test]
fn missing_config_file_is_io_error() {
    let err = load_hardware(&config_path("does_not_exist.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("does_not_exist.yaml"));
}
