//! Per-target association of arc and sky sample.

use serde::{Deserialize, Serialize};

/// A science target with its wavelength-calibration arc and sky sample region.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    /// Object name as recorded in the obslog.
    pub name: String,
    /// Reduced arc whose dispersion solution applies to this target.
    pub arc: String,
    /// Rows used to sample the sky background, e.g. `670:760,920:1020`.
    pub sky: String,
}

impl TargetRecord {
    pub fn new(name: impl Into<String>, arc: impl Into<String>, sky: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arc: arc.into(),
            sky: sky.into(),
        }
    }

    /// Base artifact name: text before the first `-` plus the final character.
    pub fn output_name(&self) -> String {
        let stem = self.name.split('-').next().unwrap_or(&self.name);
        match self.name.chars().last() {
            Some(last) if stem.len() < self.name.len() => format!("{}{}", stem, last),
            _ => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_name() {
        let a = TargetRecord::new("AM2306-721_a", "gsS20070623S0071", "520:720");
        let b = TargetRecord::new("AM2306-72_b", "gsS20070623S0081", "670:760,920:1020");

        assert_eq!(a.output_name(), "AM2306a");
        assert_eq!(b.output_name(), "AM2306b");
        assert_eq!(TargetRecord::new("NGC300", "x", "y").output_name(), "NGC300");
    }
}
