//! Typed selection criteria over obslog metadata fields.

use crate::error::{PipelineError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Date format used by the obslog `DateObs` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The single wildcard character of a pattern criterion.
pub const WILDCARD: char = '%';

/// Declared type of a metadata field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Free text, compared exactly or by pattern.
    Text,
    /// Floating point, ordered.
    Real,
    /// Calendar date, ordered.
    Date,
    /// Boolean flag stored as 0/1.
    Flag,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Real => "real",
            FieldType::Date => "date",
            FieldType::Flag => "flag",
        }
    }

    /// Whether range predicates have a defined ordering for this type.
    pub fn is_ordered(&self) -> bool {
        matches!(self, FieldType::Real | FieldType::Date)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata fields recorded in the observing log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    /// "In use" flag; frames with `use_me = 0` are never selected.
    UseMe,
    Instrument,
    /// Observation type tag (BIAS, FLAT, ARC, OBJECT).
    ObsType,
    /// Observation class (science, partnerCal, dayCal, ...).
    ObsClass,
    /// CCD binning, e.g. "2 4".
    CcdBin,
    /// Detector readout region of interest.
    RoI,
    Disperser,
    /// Grating central wavelength in nm.
    CentWave,
    AperMask,
    Object,
    DateObs,
    /// Exposure time in seconds.
    Texp,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::UseMe,
        Field::Instrument,
        Field::ObsType,
        Field::ObsClass,
        Field::CcdBin,
        Field::RoI,
        Field::Disperser,
        Field::CentWave,
        Field::AperMask,
        Field::Object,
        Field::DateObs,
        Field::Texp,
    ];

    /// Column name in the obslog table.
    pub fn column(&self) -> &'static str {
        match self {
            Field::UseMe => "use_me",
            Field::Instrument => "Instrument",
            Field::ObsType => "ObsType",
            Field::ObsClass => "ObsClass",
            Field::CcdBin => "CcdBin",
            Field::RoI => "RoI",
            Field::Disperser => "Disperser",
            Field::CentWave => "CentWave",
            Field::AperMask => "AperMask",
            Field::Object => "Object",
            Field::DateObs => "DateObs",
            Field::Texp => "Texp",
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Field::UseMe => FieldType::Flag,
            Field::CentWave | Field::Texp => FieldType::Real,
            Field::DateObs => FieldType::Date,
            _ => FieldType::Text,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Field {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.column() == s)
            .ok_or_else(|| PipelineError::invalid_criterion(s, "unknown metadata field"))
    }
}

/// A typed metadata value.
///
/// Integers have no variant of their own; see [`parse_loose`] for how
/// integer literals map onto `Real` and `Flag`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Real(f64),
    Date(NaiveDate),
    Flag(bool),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn value_type(&self) -> FieldType {
        match self {
            Value::Text(_) => FieldType::Text,
            Value::Real(_) => FieldType::Real,
            Value::Date(_) => FieldType::Date,
            Value::Flag(_) => FieldType::Flag,
        }
    }

    /// Parse a raw string as a value of the given type.
    pub fn parse_as(ty: FieldType, raw: &str) -> Option<Value> {
        let raw = raw.trim();
        match ty {
            FieldType::Text => Some(Value::Text(raw.to_string())),
            FieldType::Real => raw.parse().ok().map(Value::Real),
            FieldType::Date => NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .map(Value::Date),
            FieldType::Flag => match raw.to_ascii_lowercase().as_str() {
                "1" | "yes" | "true" => Some(Value::Flag(true)),
                "0" | "no" | "false" => Some(Value::Flag(false)),
                _ => None,
            },
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Real(a), Value::Real(b)) => a.partial_cmp(b),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Flag(a), Value::Flag(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Real(r) => write!(f, "{}", r),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Flag(b) => write!(f, "{}", u8::from(*b)),
        }
    }
}

/// A text pattern where `%` matches any run of characters.
///
/// Every other character, `_` included, matches itself. Matching is
/// case-sensitive and anchored at both ends.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    raw: String,
}

impl Pattern {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_literal(&self) -> bool {
        !self.raw.contains(WILDCARD)
    }

    /// Test a candidate string against the pattern.
    pub fn matches(&self, candidate: &str) -> bool {
        let parts: Vec<&str> = self.raw.split(WILDCARD).collect();
        if parts.len() == 1 {
            return candidate == self.raw;
        }

        let first = parts[0];
        let last = parts[parts.len() - 1];
        if candidate.len() < first.len() + last.len()
            || !candidate.starts_with(first)
            || !candidate.ends_with(last)
        {
            return false;
        }

        // Interior segments must appear in order between the anchors.
        let mut rest = &candidate[first.len()..candidate.len() - last.len()];
        for part in &parts[1..parts.len() - 1] {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
        true
    }

    /// Translate into an SQLite GLOB expression.
    pub fn to_glob(&self) -> String {
        let mut glob = String::with_capacity(self.raw.len() + 4);
        for c in self.raw.chars() {
            match c {
                WILDCARD => glob.push('*'),
                '*' => glob.push_str("[*]"),
                '?' => glob.push_str("[?]"),
                '[' => glob.push_str("[[]"),
                _ => glob.push(c),
            }
        }
        glob
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Predicate applied to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Exact match.
    Equals(Value),
    /// Exact numeric match, no tolerance.
    NumericEquals(f64),
    /// Wildcard pattern match.
    Pattern(Pattern),
    /// Closed interval `low <= v <= high`.
    Range { low: Value, high: Value },
}

impl Predicate {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Predicate::Equals(_) => "equals",
            Predicate::NumericEquals(_) => "numeric-equals",
            Predicate::Pattern(_) => "wildcard-pattern",
            Predicate::Range { .. } => "inclusive-range",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Predicate::Equals(expected) => value == expected,
            Predicate::NumericEquals(expected) => {
                matches!(value, Value::Real(v) if v == expected)
            }
            Predicate::Pattern(pattern) => {
                matches!(value, Value::Text(s) if pattern.matches(s))
            }
            Predicate::Range { low, high } => {
                matches!(
                    value.partial_cmp(low),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(
                    value.partial_cmp(high),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Equals(v) => write!(f, "= {}", v),
            Predicate::NumericEquals(v) => write!(f, "== {}", v),
            Predicate::Pattern(p) => write!(f, "like {}", p),
            Predicate::Range { low, high } => write!(f, "in [{}, {}]", low, high),
        }
    }
}

/// A validated predicate on a named field.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    field: Field,
    predicate: Predicate,
}

impl Criterion {
    /// Create a criterion, checking the predicate kind against the field type.
    pub fn new(field: Field, predicate: Predicate) -> Result<Self> {
        let criterion = Self { field, predicate };
        criterion.validate()?;
        Ok(criterion)
    }

    pub fn equals(field: Field, value: Value) -> Result<Self> {
        Self::new(field, Predicate::Equals(value))
    }

    pub fn text(field: Field, value: &str) -> Result<Self> {
        Self::equals(field, Value::text(value))
    }

    pub fn numeric(field: Field, value: f64) -> Result<Self> {
        Self::new(field, Predicate::NumericEquals(value))
    }

    pub fn pattern(field: Field, pattern: &str) -> Result<Self> {
        Self::new(field, Predicate::Pattern(Pattern::new(pattern)))
    }

    pub fn range(field: Field, low: Value, high: Value) -> Result<Self> {
        Self::new(field, Predicate::Range { low, high })
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Check that the predicate kind fits the field's declared type.
    pub fn validate(&self) -> Result<()> {
        let ty = self.field.field_type();
        let mismatch = |reason: String| Err(PipelineError::invalid_criterion(self.field, reason));

        match &self.predicate {
            Predicate::Equals(value) if value.value_type() != ty => mismatch(format!(
                "expected a {} value, got {}",
                ty,
                value.value_type()
            )),
            Predicate::NumericEquals(_) if ty != FieldType::Real => {
                mismatch(format!("numeric match on a {} field", ty))
            }
            Predicate::Pattern(_) if ty != FieldType::Text => {
                mismatch(format!("pattern match on a {} field", ty))
            }
            Predicate::Range { .. } if !ty.is_ordered() => {
                mismatch(format!("range on a {} field without an ordering", ty))
            }
            Predicate::Range { low, high } => {
                if low.value_type() != ty || high.value_type() != ty {
                    return mismatch(format!("range bounds must be {} values", ty));
                }
                match low.partial_cmp(high) {
                    Some(Ordering::Less | Ordering::Equal) => Ok(()),
                    _ => mismatch(format!("empty range {}..{}", low, high)),
                }
            }
            _ => Ok(()),
        }
    }

    /// Evaluate against a field value.
    pub fn matches(&self, value: &Value) -> bool {
        self.predicate.matches(value)
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.predicate)
    }
}

/// A criterion value as written in configuration files.
///
/// Strings carry the obslog conventions: `*` leaves the field unconstrained,
/// `%` makes a pattern and `low:high` a range on ordered fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl From<&str> for LooseValue {
    fn from(s: &str) -> Self {
        LooseValue::Text(s.to_string())
    }
}

impl From<f64> for LooseValue {
    fn from(n: f64) -> Self {
        LooseValue::Number(n)
    }
}

/// Interpret a loose value for a field.
///
/// Returns `Ok(None)` when the value leaves the field unconstrained.
pub fn parse_loose(field: Field, value: &LooseValue) -> Result<Option<Criterion>> {
    let ty = field.field_type();
    let criterion = match value {
        LooseValue::Flag(flag) => Criterion::equals(field, Value::Flag(*flag))?,
        LooseValue::Number(n) => match ty {
            FieldType::Real => Criterion::numeric(field, *n)?,
            FieldType::Flag => Criterion::equals(field, Value::Flag(*n != 0.0))?,
            _ => {
                return Err(PipelineError::invalid_criterion(
                    field,
                    format!("number given for a {} field", ty),
                ))
            }
        },
        LooseValue::Text(raw) => {
            let raw = raw.trim();
            if raw == "*" {
                return Ok(None);
            }
            if raw.contains(WILDCARD) {
                Criterion::pattern(field, raw)?
            } else if let (true, Some((low, high))) = (ty.is_ordered(), raw.split_once(':')) {
                let low = parse_typed(field, low)?;
                let high = parse_typed(field, high)?;
                Criterion::range(field, low, high)?
            } else {
                match parse_typed(field, raw)? {
                    Value::Real(n) => Criterion::numeric(field, n)?,
                    value => Criterion::equals(field, value)?,
                }
            }
        }
    };
    Ok(Some(criterion))
}

fn parse_typed(field: Field, raw: &str) -> Result<Value> {
    Value::parse_as(field.field_type(), raw).ok_or_else(|| {
        PipelineError::invalid_criterion(
            field,
            format!("'{}' is not a valid {} value", raw, field.field_type()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> Value {
        Value::Date(NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap())
    }

    #[test]
    fn test_pattern_matching() {
        let pattern = Pattern::new("AM2306-72%");

        assert!(pattern.matches("AM2306-721"));
        assert!(pattern.matches("AM2306-72_b"));
        assert!(pattern.matches("AM2306-72"));
        assert!(!pattern.matches("AM2306-73x"));
        assert!(!pattern.matches("am2306-721"));
    }

    #[test]
    fn test_pattern_interior_wildcards() {
        let pattern = Pattern::new("B600+_%");
        assert!(pattern.matches("B600+_G5323"));
        assert!(!pattern.matches("B600+G5323"));

        let pattern = Pattern::new("%CentSp%");
        assert!(pattern.matches("CentSp"));
        assert!(pattern.matches("xxCentSpyy"));

        let pattern = Pattern::new("ab%ab");
        assert!(pattern.matches("abab"));
        assert!(!pattern.matches("aba"));
    }

    #[test]
    fn test_pattern_to_glob() {
        assert_eq!(Pattern::new("AM2306-72%").to_glob(), "AM2306-72*");
        assert_eq!(Pattern::new("a*b?[%").to_glob(), "a[*]b[?][[]*");
    }

    #[test]
    fn test_date_range() {
        let criterion =
            Criterion::range(Field::DateObs, date("2007-06-05"), date("2007-07-07")).unwrap();

        assert!(criterion.matches(&date("2007-06-23")));
        assert!(criterion.matches(&date("2007-06-05")));
        assert!(criterion.matches(&date("2007-07-07")));
        assert!(!criterion.matches(&date("2007-08-01")));
    }

    #[test]
    fn test_kind_validation() {
        let err = Criterion::range(Field::Object, Value::text("a"), Value::text("b")).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidCriterion { .. }));

        assert!(Criterion::pattern(Field::CentWave, "48%").is_err());
        assert!(Criterion::numeric(Field::Object, 1.0).is_err());
        assert!(Criterion::equals(Field::CentWave, Value::text("485")).is_err());
        assert!(Criterion::range(Field::CentWave, Value::Real(500.0), Value::Real(400.0)).is_err());
    }

    #[test]
    fn test_numeric_equals_is_exact() {
        let criterion = Criterion::numeric(Field::CentWave, 485.0).unwrap();
        assert!(criterion.matches(&Value::Real(485.0)));
        assert!(!criterion.matches(&Value::Real(485.000001)));
        assert!(!criterion.matches(&Value::text("485")));
    }

    #[test]
    fn test_parse_loose() {
        let c = parse_loose(Field::DateObs, &"2007-06-05:2007-07-07".into())
            .unwrap()
            .unwrap();
        assert_eq!(c.predicate().kind_name(), "inclusive-range");

        let c = parse_loose(Field::Disperser, &"B600+_%".into()).unwrap().unwrap();
        assert_eq!(c.predicate(), &Predicate::Pattern(Pattern::new("B600+_%")));

        let c = parse_loose(Field::CentWave, &LooseValue::Number(485.0)).unwrap().unwrap();
        assert_eq!(c.predicate(), &Predicate::NumericEquals(485.0));

        let c = parse_loose(Field::UseMe, &LooseValue::Number(1.0)).unwrap().unwrap();
        assert_eq!(c.predicate(), &Predicate::Equals(Value::Flag(true)));

        assert!(parse_loose(Field::DateObs, &"*".into()).unwrap().is_none());
        assert!(parse_loose(Field::DateObs, &"June".into()).is_err());
        assert!(parse_loose(Field::Object, &LooseValue::Number(3.0)).is_err());
    }

    #[test]
    fn test_field_names() {
        assert_eq!("RoI".parse::<Field>().unwrap(), Field::RoI);
        assert_eq!("use_me".parse::<Field>().unwrap(), Field::UseMe);
        assert!("Filter".parse::<Field>().is_err());
    }
}
