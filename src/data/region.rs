//! Region contexts: named selection criteria for one detector readout.

use super::criteria::{Criterion, Field};
use crate::error::{PipelineError, Result};
use std::collections::BTreeMap;

/// A change applied when deriving one region from another.
#[derive(Debug, Clone, PartialEq)]
pub enum Override {
    /// Replace (or add) the criterion on its field.
    Set(Criterion),
    /// Drop any constraint on the field.
    Relax(Field),
}

/// Selection criteria for one readout configuration, keyed by field.
///
/// Values are owned outright, so cloning or deriving never shares state
/// between regions.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionContext {
    label: String,
    criteria: BTreeMap<Field, Criterion>,
}

impl RegionContext {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            criteria: BTreeMap::new(),
        }
    }

    /// Build from criteria; a repeated field keeps the last one.
    pub fn with_criteria(
        label: impl Into<String>,
        criteria: impl IntoIterator<Item = Criterion>,
    ) -> Self {
        let mut region = Self::new(label);
        for criterion in criteria {
            region.set(criterion);
        }
        region
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn criteria(&self) -> impl Iterator<Item = &Criterion> {
        self.criteria.values()
    }

    pub fn get(&self, field: Field) -> Option<&Criterion> {
        self.criteria.get(&field)
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Replace the criterion on its field, on this instance only.
    pub fn set(&mut self, criterion: Criterion) {
        self.criteria.insert(criterion.field(), criterion);
    }

    /// Remove the constraint on a field.
    pub fn unset(&mut self, field: Field) -> Option<Criterion> {
        self.criteria.remove(&field)
    }

    /// Derive a new region from this one; `self` is left untouched.
    pub fn derive(
        &self,
        label: impl Into<String>,
        overrides: impl IntoIterator<Item = Override>,
    ) -> RegionContext {
        let mut derived = RegionContext {
            label: label.into(),
            criteria: self.criteria.clone(),
        };
        for change in overrides {
            match change {
                Override::Set(criterion) => derived.set(criterion),
                Override::Relax(field) => {
                    derived.unset(field);
                }
            }
        }
        derived
    }

    /// Same region with one field unconstrained.
    pub fn relaxed(&self, field: Field) -> RegionContext {
        self.derive(self.label.clone(), [Override::Relax(field)])
    }

    /// Same region restricted to a single named object.
    pub fn with_object(&self, object: &str) -> Result<RegionContext> {
        let criterion = Criterion::text(Field::Object, object)?;
        Ok(self.derive(self.label.clone(), [Override::Set(criterion)]))
    }

    /// Name of a per-region artifact, e.g. `MCbias` + `Full`.
    pub fn artifact_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.label)
    }
}

/// Ordered collection of regions with unique labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionSet {
    regions: Vec<RegionContext>,
}

impl RegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region, replacing one with the same label.
    pub fn insert(&mut self, region: RegionContext) {
        match self.regions.iter().position(|r| r.label == region.label) {
            Some(index) => self.regions[index] = region,
            None => self.regions.push(region),
        }
    }

    pub fn get(&self, label: &str) -> Option<&RegionContext> {
        self.regions.iter().find(|r| r.label == label)
    }

    /// Look up a region, failing on unknown labels.
    pub fn require(&self, label: &str) -> Result<&RegionContext> {
        self.get(label)
            .ok_or_else(|| PipelineError::UnknownRegion(label.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionContext> {
        self.regions.iter()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.regions.iter().map(|r| r.label()).collect()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Copy of every region with one field unconstrained.
    pub fn relaxed(&self, field: Field) -> RegionSet {
        RegionSet {
            regions: self.regions.iter().map(|r| r.relaxed(field)).collect(),
        }
    }
}
