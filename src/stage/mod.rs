//! External calibration operations and the artifacts they produce.

pub mod adapter;
pub mod bundles;
pub mod command;
pub mod dry_run;
pub mod ledger;
pub mod options;
pub mod registry;
pub mod traits;

pub use adapter::StageAdapter;
pub use command::{CommandConfig, CommandOperation};
pub use dry_run::{CallLog, DryRunOperation};
pub use ledger::{Artifact, ArtifactLedger, ArtifactName};
pub use options::{OptionValue, StageOptions};
pub use registry::OperationRegistry;
pub use traits::{Operation, OperationError, OutputSpec, StageCall, StageInput, StageKind};
