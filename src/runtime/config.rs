//! Pipeline configuration.
//!
//! The defaults describe program GS-2007A-Q-76 (AM2306-72 with the
//! LTT9239 flux standard); a YAML file overrides any subset of fields.

use crate::data::{parse_loose, Field, LooseValue, Override, RegionContext, RegionSet, TargetRecord};
use crate::error::{PipelineError, Result};
use crate::stage::CommandConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Criteria of the base region, keyed by obslog column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub label: String,
    pub criteria: BTreeMap<String, LooseValue>,
}

/// A region derived from another; `*` relaxes a field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DerivedRegionSpec {
    pub label: String,
    pub from: String,
    pub overrides: BTreeMap<String, LooseValue>,
}

/// The flux standard star.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardConfig {
    /// Object name, also the name of the combined standard.
    pub name: String,
    /// Region its exposures are selected from.
    pub region: String,
    /// Reduced arc for its wavelength solution.
    pub arc: String,
    /// Sky sample rows.
    pub sky: String,
    /// Name in the flux standards directory.
    pub star_name: String,
}

/// Settings of the final aperture extraction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub source: String,
    pub extension: String,
    pub output: String,
    pub apertures: String,
    pub nsum: i64,
}

/// Full description of one pipeline run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Obslog database.
    pub database: PathBuf,
    /// Directory of raw frames, passed to the reduction tasks.
    pub raw_path: String,
    pub base_region: RegionSpec,
    pub derived_regions: Vec<DerivedRegionSpec>,
    /// Regions that get their own MasterCals.
    pub calibration_regions: Vec<String>,
    pub science_region: String,
    pub standard: StandardConfig,
    /// Science targets in processing order.
    pub targets: Vec<TargetRecord>,
    /// Reduced arcs with a predetermined dispersion solution.
    pub wavelength_arcs: Vec<String>,
    /// Sky-subtracted science artifacts sharing this prefix are flux calibrated.
    pub science_prefix: String,
    pub extraction: ExtractionConfig,
    pub executor: CommandConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let criteria: BTreeMap<String, LooseValue> = [
            ("Instrument", LooseValue::from("GMOS-S")),
            ("CcdBin", LooseValue::from("2 4")),
            ("RoI", LooseValue::from("Full")),
            ("Disperser", LooseValue::from("B600+_%")),
            ("CentWave", LooseValue::from(485.0)),
            ("AperMask", LooseValue::from("1.0arcsec")),
            ("Object", LooseValue::from("AM2306-72%")),
            ("DateObs", LooseValue::from("2007-06-05:2007-07-07")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let censp: BTreeMap<String, LooseValue> = [
            ("RoI", LooseValue::from("CentSp")),
            ("Object", LooseValue::from("LTT9239")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            database: PathBuf::from("./raw/obsLog.sqlite3"),
            raw_path: "./raw/".to_string(),
            base_region: RegionSpec {
                label: "Full".to_string(),
                criteria,
            },
            derived_regions: vec![DerivedRegionSpec {
                label: "CenSp".to_string(),
                from: "Full".to_string(),
                overrides: censp,
            }],
            calibration_regions: vec!["Full".to_string(), "CenSp".to_string()],
            science_region: "Full".to_string(),
            standard: StandardConfig {
                name: "LTT9239".to_string(),
                region: "CenSp".to_string(),
                arc: "gsS20070623S0109".to_string(),
                sky: "20:70,190:230".to_string(),
                star_name: "l9239".to_string(),
            },
            targets: vec![
                TargetRecord::new("AM2306-721_a", "gsS20070623S0071", "520:720"),
                TargetRecord::new("AM2306-72_b", "gsS20070623S0081", "670:760,920:1020"),
                TargetRecord::new("AM2306-721_c", "gsS20070623S0091", "170:380,920:1080"),
            ],
            wavelength_arcs: ["071", "081", "091", "109"]
                .iter()
                .map(|n| format!("gsS20070623S0{}", n))
                .collect(),
            science_prefix: "AM2306".to_string(),
            extraction: ExtractionConfig {
                source: "cstAM2306b".to_string(),
                extension: "SCI".to_string(),
                output: "ecstAM2306b.ms".to_string(),
                apertures: "222-346x4".to_string(),
                nsum: 4,
            },
            executor: CommandConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml).map_err(ConfigError::from)?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Build every configured region.
    pub fn regions(&self) -> Result<RegionSet> {
        let mut set = RegionSet::new();

        let mut base = RegionContext::new(self.base_region.label.clone());
        for (name, value) in &self.base_region.criteria {
            let field: Field = name.parse()?;
            if let Some(criterion) = parse_loose(field, value)? {
                base.set(criterion);
            }
        }
        set.insert(base);

        for spec in &self.derived_regions {
            let parent = set.require(&spec.from)?;
            let mut overrides = Vec::with_capacity(spec.overrides.len());
            for (name, value) in &spec.overrides {
                let field: Field = name.parse()?;
                overrides.push(match parse_loose(field, value)? {
                    Some(criterion) => Override::Set(criterion),
                    None => Override::Relax(field),
                });
            }
            let derived = parent.derive(spec.label.clone(), overrides);
            set.insert(derived);
        }

        Ok(set)
    }

    /// Check that regions build and every reference resolves.
    pub fn validate(&self) -> Result<()> {
        let regions = self.regions()?;

        for label in self
            .calibration_regions
            .iter()
            .chain([&self.science_region, &self.standard.region])
        {
            regions.require(label)?;
        }

        if self.targets.is_empty() {
            return Err(invalid("at least one science target is required"));
        }
        let mut outputs = HashSet::new();
        outputs.insert(self.standard.name.clone());
        for target in &self.targets {
            if target.name.is_empty() {
                return Err(invalid("science target with an empty name"));
            }
            if target.arc.is_empty() {
                return Err(invalid(&format!("target {} has no arc", target.name)));
            }
            let output = target.output_name();
            if !outputs.insert(output.clone()) {
                return Err(invalid(&format!(
                    "target {} produces {}, which is already in use",
                    target.name, output
                )));
            }
        }

        let mut arcs = HashSet::new();
        if let Some(arc) = self.wavelength_arcs.iter().find(|a| !arcs.insert(a.as_str())) {
            return Err(invalid(&format!("wavelength arc {} listed twice", arc)));
        }
        if self.science_prefix.is_empty() {
            return Err(invalid("science_prefix must not be empty"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> PipelineError {
    ConfigError::Invalid(reason.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Criterion, Predicate};

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();

        let regions = config.regions().unwrap();
        assert_eq!(regions.labels(), vec!["Full", "CenSp"]);
    }

    #[test]
    fn test_derived_region_leaves_parent_untouched() {
        let regions = PipelineConfig::default().regions().unwrap();
        let full = regions.get("Full").unwrap();
        let censp = regions.get("CenSp").unwrap();

        assert_eq!(
            censp.get(Field::Object),
            Some(&Criterion::text(Field::Object, "LTT9239").unwrap())
        );
        assert!(matches!(
            full.get(Field::Object).map(Criterion::predicate),
            Some(Predicate::Pattern(_))
        ));
        assert_eq!(censp.get(Field::DateObs), full.get(Field::DateObs));
    }

    #[test]
    fn test_yaml_overrides_subset() {
        let yaml = r#"
raw_path: /data/raw/
derived_regions:
  - label: CenSp
    from: Full
    overrides:
      RoI: CentSp
      Object: LTT9239
      DateObs: "*"
"#;
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.raw_path, "/data/raw/");
        assert_eq!(config.targets.len(), 3);

        let regions = config.regions().unwrap();
        assert!(regions.get("CenSp").unwrap().get(Field::DateObs).is_none());
    }

    #[test]
    fn test_unknown_region_reference() {
        let config = PipelineConfig {
            science_region: "Nowhere".to_string(),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PipelineError::UnknownRegion(ref r)) if r == "Nowhere"
        ));
    }

    #[test]
    fn test_unknown_field_is_invalid_criterion() {
        let mut config = PipelineConfig::default();
        config
            .base_region
            .criteria
            .insert("Seeing".to_string(), LooseValue::from("0.8"));

        assert!(matches!(
            config.validate(),
            Err(PipelineError::InvalidCriterion { .. })
        ));
    }

    #[test]
    fn test_colliding_target_outputs_rejected() {
        let mut config = PipelineConfig::default();
        config
            .targets
            .push(TargetRecord::new("AM2306-72_a", "gsS20070623S0081", "520:720"));

        let err = config.validate().unwrap_err();
        assert!(matches!(err, PipelineError::Config(ConfigError::Invalid(ref r)) if r.contains("AM2306a")));
    }

    #[test]
    fn test_target_named_like_standard_rejected() {
        let mut config = PipelineConfig::default();
        config.targets = vec![TargetRecord::new("LTT9239", "gsS20070623S0071", "520:720")];

        assert!(matches!(
            config.validate(),
            Err(PipelineError::Config(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_empty_target_name_rejected() {
        let mut config = PipelineConfig::default();
        config.targets[1].name.clear();

        assert!(matches!(
            config.validate(),
            Err(PipelineError::Config(ConfigError::Invalid(ref r))) if r.contains("empty name")
        ));
    }

    #[test]
    fn test_repeated_wavelength_arc_rejected() {
        let mut config = PipelineConfig::default();
        config.wavelength_arcs.push("gsS20070623S0071".to_string());

        assert!(matches!(
            config.validate(),
            Err(PipelineError::Config(ConfigError::Invalid(ref r))) if r.contains("gsS20070623S0071")
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::from_yaml_file(dir.path().join("none.yaml")).unwrap_err();
        assert!(matches!(err, PipelineError::Config(ConfigError::Io { .. })));
    }
}
