pub mod analysis;
pub mod config;
pub mod error;
pub mod footprint;
pub mod latency;
pub mod memory;
pub mod report;
pub mod traffic;
pub mod utilization;
pub mod workload;
