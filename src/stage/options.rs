//! Typed option maps passed to external operations.

use super::ledger::ArtifactName;
use super::traits::StageKind;
use crate::error::{PipelineError, Result};
use std::collections::BTreeMap;
use std::fmt;

/// A single option value.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// Rendered as `yes`/`no`.
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    /// Reference to an upstream artifact.
    Artifact(ArtifactName),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(true) => f.write_str("yes"),
            OptionValue::Bool(false) => f.write_str("no"),
            OptionValue::Int(i) => write!(f, "{}", i),
            OptionValue::Real(r) => write!(f, "{}", r),
            OptionValue::Text(s) => f.write_str(s),
            OptionValue::Artifact(name) => f.write_str(name.as_str()),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<i64> for OptionValue {
    fn from(i: i64) -> Self {
        OptionValue::Int(i)
    }
}

impl From<f64> for OptionValue {
    fn from(r: f64) -> Self {
        OptionValue::Real(r)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Text(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Text(s)
    }
}

impl From<ArtifactName> for OptionValue {
    fn from(name: ArtifactName) -> Self {
        OptionValue::Artifact(name)
    }
}

/// Ordered option map for one operation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOptions {
    entries: BTreeMap<String, OptionValue>,
}

impl StageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter; a repeated key keeps the last value.
    pub fn with(mut self, key: &str, value: impl Into<OptionValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<OptionValue>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Artifacts referenced through option values.
    pub fn artifacts(&self) -> impl Iterator<Item = &ArtifactName> {
        self.entries.values().filter_map(|v| match v {
            OptionValue::Artifact(name) => Some(name),
            _ => None,
        })
    }

    /// Reject keys outside the operation's recognised set.
    pub fn validate(&self, kind: StageKind) -> Result<()> {
        let recognized = kind.recognized_options();
        match self.entries.keys().find(|key| !recognized.contains(&key.as_str())) {
            Some(key) => Err(PipelineError::UnknownOption {
                task: kind.name().to_string(),
                key: key.clone(),
            }),
            None => Ok(()),
        }
    }

    /// `key=value` arguments in key order.
    pub fn render(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let options = StageOptions::new()
            .with("fl_vardq", true)
            .with("order", 5i64)
            .with("apwidth", 3.0)
            .with("bias", ArtifactName::new("MCbiasFull"))
            .with("fl_inter", false);

        assert_eq!(
            options.render(),
            vec!["apwidth=3", "bias=MCbiasFull", "fl_inter=no", "fl_vardq=yes", "order=5"]
        );
        assert_eq!(options.artifacts().count(), 1);
    }

    #[test]
    fn test_unknown_option_rejected() {
        let options = StageOptions::new().with("fl_vardq", true).with("fl_magic", true);
        let err = options.validate(StageKind::Gbias).unwrap_err();

        assert!(matches!(err, PipelineError::UnknownOption { ref key, .. } if key == "fl_magic"));
        assert!(StageOptions::new()
            .with("fl_vardq", true)
            .validate(StageKind::Gbias)
            .is_ok());
    }

    #[test]
    fn test_last_value_wins() {
        let options = StageOptions::new().with("fl_vardq", true).with("fl_vardq", false);
        assert_eq!(options.get("fl_vardq"), Some(&OptionValue::Bool(false)));
        assert_eq!(options.len(), 1);
    }
}
