//! Append-ordered in-memory metadata store.

use super::{MetadataStore, StoreError};
use crate::data::FrameRecord;
use crate::query::Query;
use rayon::prelude::*;

/// Records kept in insertion order; queries are evaluated in parallel.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    records: Vec<FrameRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = FrameRecord>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }

    /// Append a record.
    pub fn push(&mut self, record: FrameRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl MetadataStore for InMemoryStore {
    fn query(&self, query: &Query) -> Result<Vec<FrameRecord>, StoreError> {
        // rayon's collect keeps the source order.
        Ok(self
            .records
            .par_iter()
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Criterion, Field, RegionContext, Value};
    use crate::query::{compile, Category};

    fn bias(id: &str, roi: &str) -> FrameRecord {
        FrameRecord::new(id)
            .with(Field::UseMe, Value::Flag(true))
            .with(Field::ObsType, Value::text("BIAS"))
            .with(Field::RoI, Value::text(roi))
    }

    #[test]
    fn test_query_preserves_insertion_order() {
        let store = InMemoryStore::from_records(
            (0..200).map(|i| bias(&format!("S{:04}", i), if i % 3 == 0 { "Full" } else { "CentSp" })),
        );
        let region =
            RegionContext::with_criteria("Full", [Criterion::text(Field::RoI, "Full").unwrap()]);
        let query = compile(Category::Bias, &region).unwrap();

        let ids: Vec<String> = store
            .query(&query)
            .unwrap()
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        let expected: Vec<String> = (0..200).step_by(3).map(|i| format!("S{:04}", i)).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_missing_field_never_matches() {
        let store = InMemoryStore::from_records(vec![FrameRecord::new("S0001")
            .with(Field::UseMe, Value::Flag(true))
            .with(Field::ObsType, Value::text("BIAS"))]);
        let region =
            RegionContext::with_criteria("Full", [Criterion::text(Field::RoI, "Full").unwrap()]);

        let query = compile(Category::Bias, &region).unwrap();
        assert!(store.query(&query).unwrap().is_empty());
    }
}
