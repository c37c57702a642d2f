//! Operation registry keyed by stage kind.

use super::command::{CommandConfig, CommandOperation};
use super::dry_run::{CallLog, DryRunOperation};
use super::traits::{Operation, StageKind};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of available operations.
pub struct OperationRegistry {
    operations: HashMap<StageKind, Arc<dyn Operation>>,
}

impl OperationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            operations: HashMap::new(),
        }
    }

    /// Every kind runs through the external task runner.
    pub fn with_commands(config: CommandConfig) -> Self {
        let mut registry = Self::new();
        for kind in StageKind::ALL {
            registry.register(CommandOperation::new(kind, config.clone()));
        }
        registry
    }

    /// Every kind records into `log` without running anything.
    pub fn dry_run(log: &CallLog) -> Self {
        let mut registry = Self::new();
        for kind in StageKind::ALL {
            registry.register(DryRunOperation::new(kind, log.clone()));
        }
        registry
    }

    /// Register an operation, replacing any previous one for its kind.
    pub fn register<O: Operation + 'static>(&mut self, operation: O) {
        self.operations.insert(operation.kind(), Arc::new(operation));
    }

    /// Register an operation from an Arc.
    pub fn register_arc(&mut self, operation: Arc<dyn Operation>) {
        self.operations.insert(operation.kind(), operation);
    }

    pub fn get(&self, kind: StageKind) -> Option<Arc<dyn Operation>> {
        self.operations.get(&kind).cloned()
    }

    pub fn contains(&self, kind: StageKind) -> bool {
        self.operations.contains_key(&kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<StageKind> {
        let mut kinds: Vec<StageKind> = self.operations.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_dry_run_covers_all_kinds() {
        let registry = OperationRegistry::dry_run(&CallLog::new());

        assert_eq!(registry.kinds(), StageKind::ALL.to_vec());
        assert_eq!(registry.get(StageKind::Gsextract).unwrap().name(), "gsextract");
    }

    #[test]
    fn test_register_replaces() {
        let log = CallLog::new();
        let mut registry = OperationRegistry::new();
        assert!(!registry.contains(StageKind::Gbias));

        registry.register(DryRunOperation::new(StageKind::Gbias, log.clone()));
        registry.register(DryRunOperation::failing(StageKind::Gbias, log));
        assert_eq!(registry.kinds(), vec![StageKind::Gbias]);
    }
}
