//! Run orchestration for the Backcast engine: TOML configs, CSV data
//! loading, and artifact export.

pub mod artifacts;
pub mod config;
pub mod data_loader;
pub mod runner;

pub use artifacts::{ArtifactPaths, ArtifactWriter, RunManifest};
pub use config::{DataConfig, RunnerConfig, StrategyConfig};
pub use runner::{execute, verify_run_dir, ReplayReport, RunSummary};
