//! External operation trait definitions.

use super::ledger::ArtifactName;
use super::options::StageOptions;
use crate::data::FrameId;
use std::fmt;
use thiserror::Error;

/// Identifier for an external calibration operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    /// Combine biases into a bias MasterCal.
    Gbias,
    /// Build a normalised spectral flat MasterCal.
    Gsflat,
    /// Basic reduction: overscan, trim, bias, flat, mosaic.
    Gsreduce,
    /// Fit the dispersion relation of an arc.
    Gswavelength,
    /// Combine exposures.
    Gemcombine,
    /// Rectify and wavelength-calibrate.
    Gstransform,
    /// Subtract the sky background.
    Gsskysub,
    /// Extract a 1-D spectrum.
    Gsextract,
    /// Derive the sensitivity function from a standard.
    Gsstandard,
    /// Apply extinction and flux calibration.
    Gscalibrate,
    /// Spectrum arithmetic; used for the final aperture sum.
    Sarith,
}

impl StageKind {
    pub const ALL: [StageKind; 11] = [
        StageKind::Gbias,
        StageKind::Gsflat,
        StageKind::Gsreduce,
        StageKind::Gswavelength,
        StageKind::Gemcombine,
        StageKind::Gstransform,
        StageKind::Gsskysub,
        StageKind::Gsextract,
        StageKind::Gsstandard,
        StageKind::Gscalibrate,
        StageKind::Sarith,
    ];

    /// Task name of the external operation.
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Gbias => "gbias",
            StageKind::Gsflat => "gsflat",
            StageKind::Gsreduce => "gsreduce",
            StageKind::Gswavelength => "gswavelength",
            StageKind::Gemcombine => "gemcombine",
            StageKind::Gstransform => "gstransform",
            StageKind::Gsskysub => "gsskysub",
            StageKind::Gsextract => "gsextract",
            StageKind::Gsstandard => "gsstandard",
            StageKind::Gscalibrate => "gscalibrate",
            StageKind::Sarith => "sarith",
        }
    }

    /// Option keys the operation accepts.
    pub fn recognized_options(&self) -> &'static [&'static str] {
        match self {
            StageKind::Gbias => &["logfile", "rawpath", "fl_vardq", "verbose"],
            StageKind::Gsflat => &[
                "fl_over", "fl_trim", "fl_bias", "fl_dark", "fl_fixpix", "fl_oversize",
                "fl_vardq", "fl_fulldq", "rawpath", "fl_inter", "fl_detec", "function", "order",
                "logfile", "verbose", "bias",
            ],
            StageKind::Gsreduce => &[
                "fl_over", "fl_trim", "fl_bias", "fl_gscrrej", "fl_dark", "fl_flat",
                "fl_gmosaic", "fl_fixpix", "fl_gsappwave", "fl_oversize", "fl_vardq",
                "fl_fulldq", "rawpath", "fl_inter", "logfile", "verbose", "bias", "flatim",
            ],
            StageKind::Gswavelength => &[
                "coordlist", "fwidth", "nsum", "function", "order", "fl_inter", "logfile",
                "verbose",
            ],
            StageKind::Gemcombine => &[
                "combine", "reject", "fl_vardq", "fl_dqprop", "logfile", "verbose",
            ],
            StageKind::Gstransform => &[
                "fl_vardq", "interptype", "fl_flux", "logfile", "wavtraname",
            ],
            StageKind::Gsskysub => &["fl_oversize", "fl_vardq", "logfile", "long_sample"],
            StageKind::Gsextract => &[
                "apwidth", "fl_inter", "find", "trace", "tfunction", "torder", "tnsum",
                "background", "bfunction", "border", "fl_vardq", "logfile",
            ],
            StageKind::Gsstandard => &[
                "fl_inter", "starname", "caldir", "observatory", "extinction", "function",
                "order", "verbose", "logfile", "sfile", "sfunction",
            ],
            StageKind::Gscalibrate => &[
                "extinction", "fl_ext", "fl_scale", "sfunction", "fl_vardq", "logfile",
            ],
            StageKind::Sarith => &["op", "operand2", "extension", "apertures", "nsum"],
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input handed to an external operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StageInput {
    /// A raw frame selected from the metadata store.
    Frame(FrameId),
    /// An artifact produced by an earlier stage.
    Artifact(ArtifactName),
}

impl StageInput {
    pub fn as_str(&self) -> &str {
        match self {
            StageInput::Frame(id) => id.as_str(),
            StageInput::Artifact(name) => name.as_str(),
        }
    }
}

impl From<FrameId> for StageInput {
    fn from(id: FrameId) -> Self {
        StageInput::Frame(id)
    }
}

impl From<ArtifactName> for StageInput {
    fn from(name: ArtifactName) -> Self {
        StageInput::Artifact(name)
    }
}

/// How an operation names what it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSpec {
    /// A single artifact with the given name.
    Named(ArtifactName),
    /// One artifact per input, named `prefix + input`.
    Prefixed(String),
}

impl OutputSpec {
    pub fn named(name: impl Into<String>) -> Self {
        OutputSpec::Named(ArtifactName::new(name))
    }

    pub fn prefixed(prefix: impl Into<String>) -> Self {
        OutputSpec::Prefixed(prefix.into())
    }
}

impl fmt::Display for OutputSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSpec::Named(name) => f.write_str(name.as_str()),
            OutputSpec::Prefixed(prefix) => write!(f, "{}*", prefix),
        }
    }
}

/// A fully resolved invocation of an external operation.
#[derive(Debug, Clone, PartialEq)]
pub struct StageCall {
    pub kind: StageKind,
    pub inputs: Vec<StageInput>,
    pub output: OutputSpec,
    pub options: StageOptions,
}

impl StageCall {
    pub fn new(
        kind: StageKind,
        inputs: Vec<StageInput>,
        output: OutputSpec,
        options: StageOptions,
    ) -> Self {
        Self {
            kind,
            inputs,
            output,
            options,
        }
    }

    /// Inputs as a comma-separated list.
    pub fn input_list(&self) -> String {
        self.inputs
            .iter()
            .map(StageInput::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Artifacts this call produces, paired with the input each derives from.
    pub fn outputs(&self) -> Vec<(ArtifactName, Option<&StageInput>)> {
        match &self.output {
            OutputSpec::Named(name) => vec![(name.clone(), None)],
            OutputSpec::Prefixed(prefix) => self
                .inputs
                .iter()
                .map(|input| (ArtifactName::prefixed(prefix, input.as_str()), Some(input)))
                .collect(),
        }
    }

    /// Output names as a comma-separated list.
    pub fn output_list(&self) -> String {
        self.outputs()
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Failure reported by an external operation.
#[derive(Debug, Error)]
pub enum OperationError {
    /// No operation is registered for the stage kind.
    #[error("no operation registered")]
    NotRegistered,

    /// The external program could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The external program ran and reported failure.
    #[error("exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },

    /// Failure reported without an exit status.
    #[error("{0}")]
    Reported(String),
}

/// Trait for external calibration operations.
pub trait Operation: Send + Sync {
    /// Get the operation kind.
    fn kind(&self) -> StageKind;

    /// Run the operation to completion, blocking the caller.
    fn execute(&self, call: &StageCall) -> Result<(), OperationError>;

    /// Get the task name.
    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_outputs() {
        let call = StageCall::new(
            StageKind::Gsreduce,
            vec![
                FrameId::from("S20070623S0071").into(),
                FrameId::from("S20070623S0081").into(),
            ],
            OutputSpec::prefixed("gs"),
            StageOptions::new(),
        );

        assert_eq!(call.input_list(), "S20070623S0071,S20070623S0081");
        assert_eq!(call.output_list(), "gsS20070623S0071,gsS20070623S0081");
    }

    #[test]
    fn test_named_output() {
        let call = StageCall::new(
            StageKind::Gbias,
            vec![FrameId::from("a").into(), FrameId::from("b").into()],
            OutputSpec::named("MCbiasFull"),
            StageOptions::new(),
        );

        let outputs = call.outputs();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].0.as_str(), "MCbiasFull");
    }
}
