//! Error types for selection and pipeline execution.

use crate::runtime::config::ConfigError;
use crate::stage::OperationError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors raised while selecting frames or running the calibration pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A selection predicate does not fit the field it constrains.
    #[error("invalid criterion on '{field}': {reason}")]
    InvalidCriterion { field: String, reason: String },

    /// The metadata store could not be reached or queried.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stage that needs at least one input selected nothing.
    #[error("{stage}: no inputs selected for {context}")]
    EmptySelection { stage: String, context: String },

    /// An external calibration operation reported failure.
    #[error("external operation '{task}' failed: {source}")]
    ExternalOperation {
        task: String,
        #[source]
        source: OperationError,
    },

    /// An option key outside the operation's recognised set.
    #[error("option '{key}' is not recognised by '{task}'")]
    UnknownOption { task: String, key: String },

    /// An artifact name was produced twice in one run.
    #[error("artifact '{0}' was already produced in this run")]
    DuplicateArtifact(String),

    /// A region label that is not part of the configured region set.
    #[error("unknown region '{0}'")]
    UnknownRegion(String),

    /// A pipeline state change that is not a forward step.
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Configuration could not be loaded or is inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PipelineError {
    pub(crate) fn invalid_criterion(field: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidCriterion {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// True when the failure came from an unreachable metadata store.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Unavailable { .. }))
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;
