//! Selection policies: what a stage does when its selection comes up short.

use super::state::PipelineStage;
use crate::error::{PipelineError, Result};

/// Outcome of applying a policy to a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Run,
    Skip,
}

/// Rule for deciding whether a stage runs on the frames it selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Run only when strictly more than `n` inputs were selected; otherwise skip.
    SkipUnlessMoreThan(usize),
    /// At least one input is mandatory; an empty selection is fatal.
    Required,
}

impl SelectionPolicy {
    /// Decide for `count` inputs selected for `stage` in `context`.
    pub fn admit(&self, stage: PipelineStage, context: &str, count: usize) -> Result<Admission> {
        match *self {
            SelectionPolicy::SkipUnlessMoreThan(n) if count > n => Ok(Admission::Run),
            SelectionPolicy::SkipUnlessMoreThan(_) => Ok(Admission::Skip),
            SelectionPolicy::Required if count > 0 => Ok(Admission::Run),
            SelectionPolicy::Required => Err(PipelineError::EmptySelection {
                stage: stage.name().to_string(),
                context: context.to_string(),
            }),
        }
    }
}
