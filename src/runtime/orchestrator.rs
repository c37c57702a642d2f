//! Sequential orchestration of the longslit calibration graph.

use super::config::PipelineConfig;
use super::policy::Admission;
use super::state::{PipelineStage, PipelineState};
use crate::data::{Field, FrameId, Pattern, RegionSet};
use crate::error::{PipelineError, Result};
use crate::query::{Category, FileSelector};
use crate::stage::ledger::{
    CALIBRATED, EXTRACTED, MASTER_BIAS, MASTER_FLAT, REDUCED, SENSITIVITY, SKY_SUBTRACTED,
    TRANSFORMED, WAVELENGTH_DB,
};
use crate::stage::{
    bundles, Artifact, ArtifactLedger, OperationRegistry, OutputSpec, StageAdapter, StageInput,
    StageKind, StageOptions,
};
use crate::store::MetadataStore;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A stage that did not run because its selection came up short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedStage {
    pub stage: PipelineStage,
    /// Region (or target) the selection was made for.
    pub context: String,
    pub selected: usize,
}

/// Summary of a pipeline run, complete or halted.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: PipelineState,
    /// Stage that was running when the run failed.
    pub halted_at: Option<PipelineStage>,
    /// Artifacts in creation order.
    pub artifacts: Vec<Artifact>,
    pub skipped: Vec<SkippedStage>,
    /// External operations executed.
    pub invocations: usize,
}

impl RunReport {
    pub fn artifact_names(&self) -> Vec<&str> {
        self.artifacts.iter().map(|a| a.name.as_str()).collect()
    }
}

/// Runs the fixed calibration graph once, strictly in order.
pub struct Pipeline {
    config: PipelineConfig,
    selector: FileSelector,
    adapter: StageAdapter,
    state: PipelineState,
    current: Option<PipelineStage>,
    halted_at: Option<PipelineStage>,
    skipped: Vec<SkippedStage>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn MetadataStore>,
        registry: Arc<OperationRegistry>,
    ) -> Self {
        Self {
            config,
            selector: FileSelector::new(store),
            adapter: StageAdapter::new(registry),
            state: PipelineState::NotStarted,
            current: None,
            halted_at: None,
            skipped: Vec::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn ledger(&self) -> &ArtifactLedger {
        self.adapter.ledger()
    }

    /// Snapshot of the run so far.
    pub fn report(&self) -> RunReport {
        RunReport {
            state: self.state,
            halted_at: self.halted_at,
            artifacts: self.adapter.ledger().iter().cloned().collect(),
            skipped: self.skipped.clone(),
            invocations: self.adapter.invocations(),
        }
    }

    /// Run every stage to completion.
    ///
    /// The first error halts the run in `Failed`; artifacts produced before
    /// it stay in the ledger and in [`report`](Self::report).
    pub fn run(&mut self) -> Result<RunReport> {
        if self.state != PipelineState::NotStarted {
            return Err(PipelineError::InvalidTransition {
                from: self.state.to_string(),
                to: PipelineState::CalibrationBuilding.to_string(),
            });
        }

        info!(targets = self.config.targets.len(), "starting calibration pipeline");
        match self.execute() {
            Ok(()) => {
                info!(
                    artifacts = self.adapter.ledger().len(),
                    skipped = self.skipped.len(),
                    "pipeline finished"
                );
                Ok(self.report())
            }
            Err(err) => {
                self.halted_at = self.current;
                if !self.state.is_terminal() {
                    self.state = PipelineState::Failed;
                }
                error!(
                    stage = ?self.halted_at.map(|s| s.name()),
                    artifacts = self.adapter.ledger().len(),
                    error = %err,
                    "pipeline halted"
                );
                Err(err)
            }
        }
    }

    fn execute(&mut self) -> Result<()> {
        self.config.validate()?;
        let regions = self.config.regions()?;

        self.state.advance(PipelineState::CalibrationBuilding)?;
        self.build_bias(&regions)?;
        // Everything after the bias uses date-unconstrained regions.
        let regions = regions.relaxed(Field::DateObs);
        self.build_flats(&regions)?;

        self.state.advance(PipelineState::ScienceProcessing)?;
        self.reduce_arcs(&regions)?;
        self.reduce_standard(&regions)?;
        self.reduce_science(&regions)?;

        self.state.advance(PipelineState::WavelengthSolving)?;
        self.solve_wavelengths()?;

        self.state.advance(PipelineState::CombiningAndTransforming)?;
        self.standard_chain(&regions)?;
        self.science_chain(&regions)?;

        self.state.advance(PipelineState::FluxCalibrating)?;
        self.flux_calibrate()?;

        self.state.advance(PipelineState::Extracting)?;
        self.final_extraction()?;

        self.current = None;
        self.state.advance(PipelineState::Done)
    }

    fn enter(&mut self, stage: PipelineStage) {
        info!(stage = %stage, state = %self.state, "entering stage");
        self.current = Some(stage);
    }

    fn admit(&mut self, stage: PipelineStage, context: &str, selected: usize) -> Result<bool> {
        match stage.policy().admit(stage, context, selected)? {
            Admission::Run => Ok(true),
            Admission::Skip => {
                warn!(stage = %stage, context, selected, "not enough inputs, skipping");
                self.skipped.push(SkippedStage {
                    stage,
                    context: context.to_string(),
                    selected,
                });
                Ok(false)
            }
        }
    }

    /// Inputs referring to the reduced form of each frame.
    fn reduced(&self, frames: &[FrameId]) -> Vec<StageInput> {
        frames
            .iter()
            .map(|f| StageInput::Artifact(self.adapter.reference(format!("{}{}", REDUCED, f))))
            .collect()
    }

    fn build_bias(&mut self, regions: &RegionSet) -> Result<()> {
        self.enter(PipelineStage::BiasMasterCal);
        for label in self.config.calibration_regions.clone() {
            let region = regions.require(&label)?;
            let frames = self.selector.select_for(Category::Bias, region)?;
            if !self.admit(PipelineStage::BiasMasterCal, &label, frames.len())? {
                continue;
            }

            self.adapter.invoke_named(
                StageKind::Gbias,
                raw(frames),
                region.artifact_name(MASTER_BIAS),
                bundles::bias(&self.config.raw_path),
            )?;
        }
        Ok(())
    }

    fn build_flats(&mut self, regions: &RegionSet) -> Result<()> {
        self.enter(PipelineStage::FlatMasterCal);
        for label in self.config.calibration_regions.clone() {
            let region = regions.require(&label)?;
            let frames = self.selector.select_for(Category::GcalFlat, region)?;
            if !self.admit(PipelineStage::FlatMasterCal, &label, frames.len())? {
                continue;
            }

            let bias = self.adapter.reference(region.artifact_name(MASTER_BIAS));
            self.adapter.invoke_named(
                StageKind::Gsflat,
                raw(frames),
                region.artifact_name(MASTER_FLAT),
                bundles::flat(&self.config.raw_path).with("bias", bias),
            )?;
        }
        Ok(())
    }

    fn reduce_arcs(&mut self, regions: &RegionSet) -> Result<()> {
        self.enter(PipelineStage::ArcReduction);
        for label in self.config.calibration_regions.clone() {
            let region = regions.require(&label)?;
            let frames = self.selector.select_for(Category::Arc, region)?;
            if !self.admit(PipelineStage::ArcReduction, &label, frames.len())? {
                continue;
            }

            let bias = self.adapter.reference(region.artifact_name(MASTER_BIAS));
            self.adapter.invoke(
                StageKind::Gsreduce,
                raw(frames),
                OutputSpec::prefixed(REDUCED),
                bundles::arc_reduce(&self.config.raw_path).with("bias", bias),
            )?;
        }
        Ok(())
    }

    fn reduce_standard(&mut self, regions: &RegionSet) -> Result<()> {
        self.enter(PipelineStage::StandardReduction);
        let label = self.config.standard.region.clone();
        let options = bundles::standard_reduce(&self.config.raw_path);
        self.reduce_with_flat(PipelineStage::StandardReduction, Category::Std, regions, &label, options)
    }

    fn reduce_science(&mut self, regions: &RegionSet) -> Result<()> {
        self.enter(PipelineStage::ScienceReduction);
        let label = self.config.science_region.clone();
        let options = bundles::science_reduce(&self.config.raw_path);
        self.reduce_with_flat(PipelineStage::ScienceReduction, Category::SciSpec, regions, &label, options)
    }

    fn reduce_with_flat(
        &mut self,
        stage: PipelineStage,
        category: Category,
        regions: &RegionSet,
        label: &str,
        options: StageOptions,
    ) -> Result<()> {
        let region = regions.require(label)?;
        let frames = self.selector.select_for(category, region)?;
        if !self.admit(stage, label, frames.len())? {
            return Ok(());
        }

        let bias = self.adapter.reference(region.artifact_name(MASTER_BIAS));
        let flat = self.adapter.reference(region.artifact_name(MASTER_FLAT));
        self.adapter.invoke(
            StageKind::Gsreduce,
            raw(frames),
            OutputSpec::prefixed(REDUCED),
            options.with("bias", bias).with("flatim", flat),
        )?;
        Ok(())
    }

    /// Arcs are addressed by name; their dispersion solutions are predetermined.
    fn solve_wavelengths(&mut self) -> Result<()> {
        self.enter(PipelineStage::WavelengthSolution);
        let arcs = self.config.wavelength_arcs.clone();
        self.admit(PipelineStage::WavelengthSolution, "wavelength arcs", arcs.len())?;

        for arc in arcs {
            let input = self.adapter.reference(arc.as_str());
            self.adapter.invoke_named(
                StageKind::Gswavelength,
                vec![input.into()],
                format!("{}{}", WAVELENGTH_DB, arc),
                bundles::wavelength(),
            )?;
        }
        Ok(())
    }

    fn standard_chain(&mut self, regions: &RegionSet) -> Result<()> {
        self.enter(PipelineStage::StandardChain);
        let standard = self.config.standard.clone();
        let region = regions.require(&standard.region)?;
        let frames = self.selector.select_for(Category::Std, region)?;
        self.admit(PipelineStage::StandardChain, &standard.name, frames.len())?;

        let inputs = self.reduced(&frames);
        let combined = self.adapter.invoke_named(
            StageKind::Gemcombine,
            inputs,
            standard.name.as_str(),
            bundles::standard_combine(),
        )?;

        let arc = self.adapter.reference(standard.arc.as_str());
        let transformed = self.adapter.invoke_named(
            StageKind::Gstransform,
            vec![combined.into()],
            chained(&standard.name, &[TRANSFORMED]),
            bundles::transform().with("wavtraname", arc),
        )?;

        let sky_subtracted = self.adapter.invoke_named(
            StageKind::Gsskysub,
            vec![transformed.into()],
            chained(&standard.name, &[TRANSFORMED, SKY_SUBTRACTED]),
            StageOptions::new().with("long_sample", standard.sky.as_str()),
        )?;

        let extracted = self.adapter.invoke_named(
            StageKind::Gsextract,
            vec![sky_subtracted.into()],
            chained(&standard.name, &[TRANSFORMED, SKY_SUBTRACTED, EXTRACTED]),
            bundles::extract(),
        )?;

        self.adapter.invoke_named(
            StageKind::Gsstandard,
            vec![extracted.into()],
            SENSITIVITY,
            bundles::sensitivity(&standard.star_name),
        )?;
        Ok(())
    }

    fn science_chain(&mut self, regions: &RegionSet) -> Result<()> {
        self.enter(PipelineStage::ScienceChain);
        let base = regions.require(&self.config.science_region)?;

        for target in self.config.targets.clone() {
            let region = base.with_object(&target.name)?;
            let frames = self.selector.select_for(Category::SciSpec, &region)?;
            self.admit(PipelineStage::ScienceChain, &target.name, frames.len())?;

            let out = target.output_name();
            info!(object = %target.name, output = %out, frames = frames.len(), "processing target");

            let inputs = self.reduced(&frames);
            let combined = self.adapter.invoke_named(
                StageKind::Gemcombine,
                inputs,
                out.as_str(),
                bundles::science_combine(),
            )?;

            let arc = self.adapter.reference(target.arc.as_str());
            let transformed = self.adapter.invoke_named(
                StageKind::Gstransform,
                vec![combined.into()],
                chained(&out, &[TRANSFORMED]),
                bundles::transform().with("wavtraname", arc),
            )?;

            self.adapter.invoke_named(
                StageKind::Gsskysub,
                vec![transformed.into()],
                chained(&out, &[TRANSFORMED, SKY_SUBTRACTED]),
                bundles::sky().with("long_sample", target.sky.as_str()),
            )?;
        }
        Ok(())
    }

    fn flux_calibrate(&mut self) -> Result<()> {
        self.enter(PipelineStage::FluxCalibration);
        let pattern = Pattern::new(format!(
            "{}%",
            chained(&self.config.science_prefix, &[TRANSFORMED, SKY_SUBTRACTED])
        ));
        let science = self.adapter.ledger().matching(&pattern);
        self.admit(PipelineStage::FluxCalibration, pattern.as_str(), science.len())?;

        let sensitivity = self.adapter.reference(SENSITIVITY);
        self.adapter.invoke(
            StageKind::Gscalibrate,
            science.into_iter().map(StageInput::Artifact).collect(),
            OutputSpec::prefixed(CALIBRATED),
            bundles::calibrate().with("sfunction", sensitivity.clone()),
        )?;

        let extracted = self.adapter.reference(chained(
            &self.config.standard.name,
            &[TRANSFORMED, SKY_SUBTRACTED, EXTRACTED],
        ));
        self.adapter.invoke(
            StageKind::Gscalibrate,
            vec![extracted.into()],
            OutputSpec::prefixed(CALIBRATED),
            bundles::calibrate()
                .with("sfunction", sensitivity)
                .with("fl_vardq", false),
        )?;
        Ok(())
    }

    fn final_extraction(&mut self) -> Result<()> {
        self.enter(PipelineStage::FinalExtraction);
        let extraction = self.config.extraction.clone();
        let source = self.adapter.reference(extraction.source.as_str());

        self.adapter.invoke_named(
            StageKind::Sarith,
            vec![source.into()],
            extraction.output.as_str(),
            StageOptions::new()
                .with("op", "copy")
                .with("operand2", "")
                .with("extension", extraction.extension.as_str())
                .with("apertures", extraction.apertures.as_str())
                .with("nsum", extraction.nsum),
        )?;
        Ok(())
    }
}

fn raw(frames: Vec<FrameId>) -> Vec<StageInput> {
    frames.into_iter().map(StageInput::Frame).collect()
}

/// Apply processing prefixes in order: `t`, then `s` gives `stAM2306a`.
fn chained(base: &str, prefixes: &[&str]) -> String {
    prefixes
        .iter()
        .fold(base.to_string(), |name, prefix| format!("{}{}", prefix, name))
}
