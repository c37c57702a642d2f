//! Compile a category and region context into an executable query.

use crate::data::{Criterion, Field, FrameRecord, Predicate, RegionContext, Value, DATE_FORMAT};
use crate::error::{PipelineError, Result};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Kind of exposure being selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Zero-second bias exposures.
    Bias,
    /// GCAL spectral flats.
    GcalFlat,
    /// Comparison arcs.
    Arc,
    /// Standard star exposures.
    Std,
    /// Science spectra.
    SciSpec,
}

const BIAS_SCOPE: &[Field] = &[Field::Instrument, Field::CcdBin, Field::RoI, Field::DateObs];

const CAL_SCOPE: &[Field] = &[
    Field::Instrument,
    Field::CcdBin,
    Field::RoI,
    Field::Disperser,
    Field::CentWave,
    Field::AperMask,
    Field::DateObs,
];

const STD_SCOPE: &[Field] = &[
    Field::Instrument,
    Field::CcdBin,
    Field::RoI,
    Field::Disperser,
    Field::CentWave,
    Field::AperMask,
    Field::Object,
    Field::DateObs,
];

const SCIENCE_SCOPE: &[Field] = &[
    Field::Instrument,
    Field::CcdBin,
    Field::RoI,
    Field::Disperser,
    Field::CentWave,
    Field::AperMask,
    Field::Object,
    Field::DateObs,
    Field::Texp,
];

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Bias,
        Category::GcalFlat,
        Category::Arc,
        Category::Std,
        Category::SciSpec,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Bias => "bias",
            Category::GcalFlat => "gcalFlat",
            Category::Arc => "arc",
            Category::Std => "std",
            Category::SciSpec => "sciSpec",
        }
    }

    /// Region fields this category is selected by.
    pub fn scope(&self) -> &'static [Field] {
        match self {
            Category::Bias => BIAS_SCOPE,
            Category::GcalFlat | Category::Arc => CAL_SCOPE,
            Category::Std => STD_SCOPE,
            Category::SciSpec => SCIENCE_SCOPE,
        }
    }

    /// Fields fixed by the inclusion rules; region criteria on them are ignored.
    pub fn owns(field: Field) -> bool {
        matches!(field, Field::UseMe | Field::ObsType | Field::ObsClass)
    }

    /// Implicit predicates injected ahead of the region's criteria.
    pub fn inclusion_rules(&self) -> Result<Vec<Criterion>> {
        let mut rules = vec![Criterion::equals(Field::UseMe, Value::Flag(true))?];
        let (obs_type, obs_class) = match self {
            Category::Bias => ("BIAS", None),
            Category::GcalFlat => ("FLAT", None),
            Category::Arc => ("ARC", None),
            Category::Std => ("OBJECT", Some("partnerCal")),
            Category::SciSpec => ("OBJECT", Some("science")),
        };
        rules.push(Criterion::text(Field::ObsType, obs_type)?);
        if let Some(class) = obs_class {
            rules.push(Criterion::text(Field::ObsClass, class)?);
        }
        Ok(rules)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| {
                PipelineError::invalid_criterion("category", format!("unknown category '{}'", s))
            })
    }
}

/// A compiled selection: conjunction of validated criteria.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    category: Category,
    region: String,
    clauses: Vec<Criterion>,
}

/// Parameterised SQL rendering of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Query {
    pub fn category(&self) -> Category {
        self.category
    }

    /// Label of the region the query was compiled from.
    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn clauses(&self) -> &[Criterion] {
        &self.clauses
    }

    /// Evaluate the query against one record.
    ///
    /// A record missing a constrained field does not match.
    pub fn matches(&self, record: &FrameRecord) -> bool {
        self.clauses.iter().all(|clause| {
            record
                .get(clause.field())
                .is_some_and(|value| clause.matches(value))
        })
    }

    /// Render as an SQLite statement over the obslog table, in insertion order.
    pub fn to_sql(&self, table: &str, id_column: &str) -> SqlQuery {
        let mut conditions = Vec::with_capacity(self.clauses.len());
        let mut params = Vec::new();

        for clause in &self.clauses {
            let column = quote_identifier(clause.field().column());
            match clause.predicate() {
                Predicate::Equals(value) => {
                    conditions.push(format!("{} = ?", column));
                    params.push(value.clone());
                }
                Predicate::NumericEquals(value) => {
                    conditions.push(format!("{} = ?", column));
                    params.push(Value::Real(*value));
                }
                Predicate::Pattern(pattern) => {
                    conditions.push(format!("{} GLOB ?", column));
                    params.push(Value::Text(pattern.to_glob()));
                }
                Predicate::Range { low, high } => {
                    // Stored dates may carry a time; compare the day only.
                    let operand = match low {
                        Value::Date(_) => format!("substr({}, 1, 10)", column),
                        _ => column,
                    };
                    conditions.push(format!("({col} >= ? AND {col} <= ?)", col = operand));
                    params.push(low.clone());
                    params.push(high.clone());
                }
            }
        }

        let filter = if conditions.is_empty() {
            String::from("1")
        } else {
            conditions.join(" AND ")
        };

        SqlQuery {
            sql: format!(
                "SELECT *, {} AS frame_id FROM {} WHERE {} ORDER BY rowid",
                quote_identifier(id_column),
                quote_identifier(table),
                filter
            ),
            params: params
                .into_iter()
                .map(|p| match p {
                    // Dates are stored as ISO text, which orders lexicographically.
                    Value::Date(d) => Value::Text(d.format(DATE_FORMAT).to_string()),
                    other => other,
                })
                .collect(),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:", self.category, self.region)?;
        for (i, clause) in self.clauses.iter().enumerate() {
            let sep = if i == 0 { " " } else { " AND " };
            write!(f, "{}{}", sep, clause)?;
        }
        Ok(())
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Compile the selection for `category` under `region`.
///
/// Inclusion rules come first, then the region's in-scope criteria in field
/// order, so equal inputs always give equal queries.
pub fn compile(category: Category, region: &RegionContext) -> Result<Query> {
    let mut clauses = category.inclusion_rules()?;

    for criterion in region.criteria() {
        let field = criterion.field();
        if Category::owns(field) || !category.scope().contains(&field) {
            continue;
        }
        criterion.validate()?;
        clauses.push(criterion.clone());
    }

    let query = Query {
        category,
        region: region.label().to_string(),
        clauses,
    };
    debug!(query = %query, "compiled selection query");
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Criterion, RegionContext};

    fn full() -> RegionContext {
        RegionContext::with_criteria(
            "Full",
            [
                Criterion::equals(Field::UseMe, Value::Flag(false)).unwrap(),
                Criterion::text(Field::Instrument, "GMOS-S").unwrap(),
                Criterion::text(Field::RoI, "Full").unwrap(),
                Criterion::pattern(Field::Disperser, "B600+_%").unwrap(),
                Criterion::numeric(Field::CentWave, 485.0).unwrap(),
                Criterion::pattern(Field::Object, "AM2306-72%").unwrap(),
            ],
        )
    }

    #[test]
    fn test_compile_is_deterministic() {
        for category in Category::ALL {
            let a = compile(category, &full()).unwrap();
            let b = compile(category, &full()).unwrap();
            assert_eq!(a, b);
            assert_eq!(a.to_sql("obslog", "File"), b.to_sql("obslog", "File"));
        }
    }

    #[test]
    fn test_inclusion_rules_injected() {
        let query = compile(Category::SciSpec, &full()).unwrap();
        let clauses = query.clauses();

        assert_eq!(clauses[0].field(), Field::UseMe);
        assert_eq!(clauses[0].predicate(), &Predicate::Equals(Value::Flag(true)));
        assert_eq!(clauses[1].predicate(), &Predicate::Equals(Value::text("OBJECT")));
        assert_eq!(clauses[2].predicate(), &Predicate::Equals(Value::text("science")));
        // The region's own use_me criterion never overrides the inclusion rule.
        assert_eq!(clauses.iter().filter(|c| c.field() == Field::UseMe).count(), 1);
    }

    #[test]
    fn test_category_scope() {
        let bias = compile(Category::Bias, &full()).unwrap();
        assert!(bias.clauses().iter().all(|c| c.field() != Field::Object));
        assert!(bias.clauses().iter().all(|c| c.field() != Field::Disperser));

        let arc = compile(Category::Arc, &full()).unwrap();
        assert!(arc.clauses().iter().any(|c| c.field() == Field::Disperser));
        assert!(arc.clauses().iter().all(|c| c.field() != Field::Object));

        let std = compile(Category::Std, &full()).unwrap();
        assert!(std.clauses().iter().any(|c| c.field() == Field::Object));
    }

    #[test]
    fn test_to_sql() {
        let region = RegionContext::with_criteria(
            "Full",
            [Criterion::range(
                Field::DateObs,
                Value::parse_as(crate::data::FieldType::Date, "2007-06-05").unwrap(),
                Value::parse_as(crate::data::FieldType::Date, "2007-07-07").unwrap(),
            )
            .unwrap()],
        );
        let sql = compile(Category::Bias, &region).unwrap().to_sql("obslog", "File");

        assert_eq!(
            sql.sql,
            "SELECT *, \"File\" AS frame_id FROM \"obslog\" WHERE \"use_me\" = ? AND \"ObsType\" = ? \
             AND (substr(\"DateObs\", 1, 10) >= ? AND substr(\"DateObs\", 1, 10) <= ?) ORDER BY rowid"
        );
        assert_eq!(
            sql.params,
            vec![
                Value::Flag(true),
                Value::text("BIAS"),
                Value::text("2007-06-05"),
                Value::text("2007-07-07"),
            ]
        );
    }

    #[test]
    fn test_category_names() {
        assert_eq!("gcalFlat".parse::<Category>().unwrap(), Category::GcalFlat);
        assert!("dark".parse::<Category>().is_err());
    }
}
