//! GMOS longslit calibration - metadata-driven file selection and staged
//! reduction.
//!
//! This crate selects raw frames from an observing-log database and drives
//! the external calibration tasks that turn them into flux-calibrated 1-D
//! spectra:
//!
//! - Typed selection criteria (exact, numeric, wildcard, range) per field
//! - Region contexts derived from one another without shared state
//! - Category queries compiled to SQL or evaluated in memory (rayon)
//! - A fixed, sequential stage graph with per-stage skip/fail policies
//! - A write-once ledger of the artifacts each stage produces
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │        Pipeline Orchestrator        │
//! │  state machine, stage graph, report │
//! └─────────────────────────────────────┘
//!          │                    │
//!          ▼                    ▼
//! ┌─────────────────┐  ┌────────────────┐
//! │  File Selector  │  │ Stage Adapter  │
//! │ ┌─────────────┐ │  │ ┌────────────┐ │
//! │ │  Compiler   │ │  │ │  Registry  │ │
//! │ └─────────────┘ │  │ └────────────┘ │
//! │ ┌─────────────┐ │  │ ┌────────────┐ │
//! │ │MetadataStore│ │  │ │   Ledger   │ │
//! │ └─────────────┘ │  │ └────────────┘ │
//! └─────────────────┘  └────────────────┘
//!          │                    │
//!          ▼                    ▼
//!   obslog (SQLite)      external tasks
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use gmosrs::{CallLog, OperationRegistry, Pipeline, PipelineConfig, SqliteConfig, SqliteStore};
//! use std::sync::Arc;
//!
//! # fn main() -> gmosrs::Result<()> {
//! let config = PipelineConfig::default();
//! let store = SqliteStore::open(SqliteConfig::with_path(&config.database))?;
//! let registry = OperationRegistry::dry_run(&CallLog::new());
//!
//! let mut pipeline = Pipeline::new(config, Arc::new(store), Arc::new(registry));
//! let report = pipeline.run()?;
//! println!("{} artifacts", report.artifacts.len());
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
pub mod query;
pub mod runtime;
pub mod stage;
pub mod store;

// Re-export commonly used items
pub use data::{
    Criterion, Field, FieldType, FrameId, FrameRecord, LooseValue, Pattern, Predicate,
    RegionContext, RegionSet, TargetRecord, Value,
};
pub use error::{PipelineError, Result};
pub use query::{compile, Category, FileSelector, Query};
pub use runtime::{Pipeline, PipelineConfig, PipelineStage, PipelineState, RunReport};
pub use stage::{
    ArtifactLedger, ArtifactName, CallLog, CommandConfig, Operation, OperationRegistry,
    StageAdapter, StageKind, StageOptions,
};
pub use store::{InMemoryStore, MetadataStore, SqliteConfig, SqliteStore, StoreError};
