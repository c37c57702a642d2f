//! Pipeline runtime: configuration, run states and the orchestrator.

pub mod config;
pub mod orchestrator;
pub mod policy;
pub mod state;

pub use config::{ConfigError, PipelineConfig};
pub use orchestrator::{Pipeline, RunReport, SkippedStage};
pub use policy::{Admission, SelectionPolicy};
pub use state::{PipelineStage, PipelineState};
