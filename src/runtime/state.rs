//! Pipeline run states and the stages executed within them.

use super::policy::SelectionPolicy;
use crate::error::{PipelineError, Result};
use std::fmt;

/// Progress of one pipeline run. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PipelineState {
    NotStarted,
    CalibrationBuilding,
    ScienceProcessing,
    WavelengthSolving,
    CombiningAndTransforming,
    FluxCalibrating,
    Extracting,
    Done,
    /// Terminal; reached from any non-terminal state on a fatal error.
    Failed,
}

impl PipelineState {
    /// The state that follows this one in a successful run.
    pub fn successor(&self) -> Option<PipelineState> {
        use PipelineState::*;
        match self {
            NotStarted => Some(CalibrationBuilding),
            CalibrationBuilding => Some(ScienceProcessing),
            ScienceProcessing => Some(WavelengthSolving),
            WavelengthSolving => Some(CombiningAndTransforming),
            CombiningAndTransforming => Some(FluxCalibrating),
            FluxCalibrating => Some(Extracting),
            Extracting => Some(Done),
            Done | Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }

    /// Move to `next` if it is the immediate successor, or `Failed`.
    pub fn advance(&mut self, next: PipelineState) -> Result<()> {
        let allowed = match next {
            PipelineState::Failed => !self.is_terminal(),
            _ => self.successor() == Some(next),
        };
        if !allowed {
            return Err(PipelineError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            });
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Steps of the fixed calibration graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    BiasMasterCal,
    FlatMasterCal,
    ArcReduction,
    StandardReduction,
    ScienceReduction,
    WavelengthSolution,
    StandardChain,
    ScienceChain,
    FluxCalibration,
    FinalExtraction,
}

impl PipelineStage {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::BiasMasterCal => "bias-mastercal",
            PipelineStage::FlatMasterCal => "flat-mastercal",
            PipelineStage::ArcReduction => "arc-reduction",
            PipelineStage::StandardReduction => "standard-reduction",
            PipelineStage::ScienceReduction => "science-reduction",
            PipelineStage::WavelengthSolution => "wavelength-solution",
            PipelineStage::StandardChain => "standard-chain",
            PipelineStage::ScienceChain => "science-chain",
            PipelineStage::FluxCalibration => "flux-calibration",
            PipelineStage::FinalExtraction => "final-extraction",
        }
    }

    /// How the stage treats too few selected inputs.
    pub fn policy(&self) -> SelectionPolicy {
        match self {
            // A single bias cannot be combined; an earlier MasterCal may exist.
            PipelineStage::BiasMasterCal => SelectionPolicy::SkipUnlessMoreThan(1),
            PipelineStage::FlatMasterCal
            | PipelineStage::ArcReduction
            | PipelineStage::StandardReduction
            | PipelineStage::ScienceReduction => SelectionPolicy::SkipUnlessMoreThan(0),
            PipelineStage::WavelengthSolution
            | PipelineStage::StandardChain
            | PipelineStage::ScienceChain
            | PipelineStage::FluxCalibration
            | PipelineStage::FinalExtraction => SelectionPolicy::Required,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
