//! Pipeline construction and execution.
//!
//! This module provides:
//! - Pipeline configuration (admission and drive policies)
//! - A validating pipeline builder
//! - The sweeping executor and its run reports
//! - Structured status snapshots

mod builder;
mod config;
mod executor;
mod report;
mod status;

pub use builder::PipelineBuilder;
pub use config::{AdmissionPolicy, DrivePolicy, PipelineConfig};
pub use executor::Pipeline;
pub use report::RunReport;
pub use status::{PipelineStatus, StageSnapshot};
