//! Write-once record of the artifacts produced during one run.

use super::traits::StageKind;
use crate::data::Pattern;
use crate::error::{PipelineError, Result};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Prefix of reduced frames.
pub const REDUCED: &str = "gs";
/// Prefix of rectified, wavelength-calibrated spectra.
pub const TRANSFORMED: &str = "t";
/// Prefix of sky-subtracted spectra.
pub const SKY_SUBTRACTED: &str = "s";
/// Prefix of extracted 1-D spectra.
pub const EXTRACTED: &str = "e";
/// Prefix of flux-calibrated spectra.
pub const CALIBRATED: &str = "c";
/// Prefix of wavelength solution databases.
pub const WAVELENGTH_DB: &str = "id";
/// Prefix of per-region bias MasterCals.
pub const MASTER_BIAS: &str = "MCbias";
/// Prefix of per-region flat MasterCals.
pub const MASTER_FLAT: &str = "MCflat";
/// Name of the sensitivity function.
pub const SENSITIVITY: &str = "sens";

/// Name of an output product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactName(String);

impl ArtifactName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// `prefix` glued to `base`, e.g. `t` + `AM2306a`.
    pub fn prefixed(prefix: &str, base: &str) -> Self {
        Self(format!("{}{}", prefix, base))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArtifactName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A produced product and what it was made from.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub name: ArtifactName,
    pub stage: StageKind,
    /// Frames and artifacts consumed to make it.
    pub consumed: Vec<String>,
}

/// Artifacts in creation order; a name can be registered once.
#[derive(Debug, Default, Clone)]
pub struct ArtifactLedger {
    artifacts: Vec<Artifact>,
    index: HashMap<ArtifactName, usize>,
}

impl ArtifactLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new artifact.
    pub fn register(&mut self, artifact: Artifact) -> Result<()> {
        if self.index.contains_key(&artifact.name) {
            return Err(PipelineError::DuplicateArtifact(artifact.name.to_string()));
        }
        self.index.insert(artifact.name.clone(), self.artifacts.len());
        self.artifacts.push(artifact);
        Ok(())
    }

    pub fn get(&self, name: &ArtifactName) -> Option<&Artifact> {
        self.index.get(name).map(|&i| &self.artifacts[i])
    }

    pub fn contains(&self, name: &ArtifactName) -> bool {
        self.index.contains_key(name)
    }

    /// Name an artifact that a stage will consume.
    ///
    /// Products of an earlier run are valid inputs, so an unknown name is
    /// returned as-is with a warning.
    pub fn reference(&self, name: impl Into<String>) -> ArtifactName {
        let name = ArtifactName::new(name);
        if !self.contains(&name) {
            warn!(artifact = %name, "artifact not produced in this run; assuming it already exists");
        }
        name
    }

    /// Artifacts whose name matches the pattern, in creation order.
    pub fn matching(&self, pattern: &Pattern) -> Vec<ArtifactName> {
        self.artifacts
            .iter()
            .filter(|a| pattern.matches(a.name.as_str()))
            .map(|a| a.name.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(name: &str) -> Artifact {
        Artifact {
            name: ArtifactName::new(name),
            stage: StageKind::Gsskysub,
            consumed: vec![],
        }
    }

    #[test]
    fn test_register_once() {
        let mut ledger = ArtifactLedger::new();
        ledger.register(artifact("stAM2306a")).unwrap();

        let err = ledger.register(artifact("stAM2306a")).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateArtifact(ref n) if n == "stAM2306a"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_matching_keeps_creation_order() {
        let mut ledger = ArtifactLedger::new();
        for name in ["stAM2306b", "tAM2306b", "stAM2306a", "stLTT9239"] {
            ledger.register(artifact(name)).unwrap();
        }

        let matched = ledger.matching(&Pattern::new("stAM2306%"));
        let names: Vec<&str> = matched.iter().map(ArtifactName::as_str).collect();
        assert_eq!(names, vec!["stAM2306b", "stAM2306a"]);
    }

    #[test]
    fn test_reference_passes_unknown_through() {
        let ledger = ArtifactLedger::new();
        assert_eq!(ledger.reference("MCbiasFull").as_str(), "MCbiasFull");
    }
}
