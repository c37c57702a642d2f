//! Operations that record calls instead of running them.

use super::traits::{Operation, OperationError, StageCall, StageKind};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// Shared, ordered log of the calls made during a run.
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<StageCall>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: StageCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    /// Snapshot of the calls so far.
    pub fn calls(&self) -> Vec<StageCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Records each call; optionally reports failure after recording.
pub struct DryRunOperation {
    kind: StageKind,
    log: CallLog,
    fail: bool,
}

impl DryRunOperation {
    pub fn new(kind: StageKind, log: CallLog) -> Self {
        Self {
            kind,
            log,
            fail: false,
        }
    }

    /// An operation that always fails.
    pub fn failing(kind: StageKind, log: CallLog) -> Self {
        Self {
            kind,
            log,
            fail: true,
        }
    }
}

impl Operation for DryRunOperation {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn execute(&self, call: &StageCall) -> Result<(), OperationError> {
        info!(
            task = self.kind.name(),
            inputs = %call.input_list(),
            outputs = %call.output_list(),
            options = ?call.options.render(),
            "dry run"
        );
        self.log.record(call.clone());

        if self.fail {
            return Err(OperationError::Reported(format!(
                "{} reported an error",
                self.kind
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FrameId;
    use crate::stage::{ArtifactName, OutputSpec, StageOptions};

    #[test]
    fn test_calls_are_recorded_in_order() {
        let log = CallLog::new();
        let op = DryRunOperation::new(StageKind::Gsreduce, log.clone());

        for id in ["S1", "S2"] {
            let call = StageCall::new(
                StageKind::Gsreduce,
                vec![FrameId::from(id).into()],
                OutputSpec::prefixed("gs"),
                StageOptions::new(),
            );
            op.execute(&call).unwrap();
        }

        let calls = log.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].input_list(), "S2");
    }

    #[test]
    fn test_failing_still_records() {
        let log = CallLog::new();
        let op = DryRunOperation::failing(StageKind::Gsskysub, log.clone());
        let call = StageCall::new(
            StageKind::Gsskysub,
            vec![ArtifactName::new("tAM2306b").into()],
            OutputSpec::named("stAM2306b"),
            StageOptions::new(),
        );

        assert!(op.execute(&call).is_err());
        assert_eq!(log.len(), 1);
    }
}
