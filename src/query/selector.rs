//! File selection against the metadata store.

use super::compiler::{compile, Category, Query};
use crate::data::{FrameId, RegionContext};
use crate::error::{PipelineError, Result};
use crate::store::MetadataStore;
use std::sync::Arc;
use tracing::debug;

/// Run a compiled query and return matching frame identifiers in store order.
///
/// No match is an empty list, not an error.
pub fn select(store: &dyn MetadataStore, query: &Query) -> Result<Vec<FrameId>> {
    let records = store.query(query)?;
    let frames: Vec<FrameId> = records.into_iter().map(|record| record.id).collect();
    debug!(
        category = %query.category(),
        region = query.region(),
        selected = frames.len(),
        "selected frames"
    );
    Ok(frames)
}

/// Selects frames from a shared metadata store.
#[derive(Clone)]
pub struct FileSelector {
    store: Arc<dyn MetadataStore>,
}

impl FileSelector {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// Execute a compiled query.
    pub fn select(&self, query: &Query) -> Result<Vec<FrameId>> {
        select(self.store.as_ref(), query)
    }

    /// Compile and execute in one step.
    pub fn select_for(&self, category: Category, region: &RegionContext) -> Result<Vec<FrameId>> {
        let query = compile(category, region)?;
        self.select(&query)
    }

    /// Like [`select`](Self::select) but an empty result is an error.
    pub fn select_required(&self, stage: &str, query: &Query) -> Result<Vec<FrameId>> {
        let frames = self.select(query)?;
        if frames.is_empty() {
            return Err(PipelineError::EmptySelection {
                stage: stage.to_string(),
                context: format!("{} in region {}", query.category(), query.region()),
            });
        }
        Ok(frames)
    }
}
