//! Uniform invocation of external operations.

use super::ledger::{Artifact, ArtifactLedger, ArtifactName};
use super::options::StageOptions;
use super::registry::OperationRegistry;
use super::traits::{OperationError, OutputSpec, StageCall, StageInput, StageKind};
use crate::error::{PipelineError, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Invokes registered operations and records what they produce.
pub struct StageAdapter {
    registry: Arc<OperationRegistry>,
    ledger: ArtifactLedger,
    invocations: usize,
}

impl StageAdapter {
    pub fn new(registry: Arc<OperationRegistry>) -> Self {
        Self {
            registry,
            ledger: ArtifactLedger::new(),
            invocations: 0,
        }
    }

    pub fn ledger(&self) -> &ArtifactLedger {
        &self.ledger
    }

    /// Number of operations executed, including failed ones.
    pub fn invocations(&self) -> usize {
        self.invocations
    }

    /// Name an upstream artifact for use as an input or option value.
    pub fn reference(&self, name: impl Into<String>) -> ArtifactName {
        self.ledger.reference(name)
    }

    /// Run one operation to completion.
    ///
    /// Nothing is recorded unless the operation succeeds. An output name
    /// already in the ledger, or repeated within the call, is rejected
    /// before the operation runs.
    pub fn invoke(
        &mut self,
        kind: StageKind,
        inputs: Vec<StageInput>,
        output: OutputSpec,
        options: StageOptions,
    ) -> Result<Vec<ArtifactName>> {
        if inputs.is_empty() {
            return Err(PipelineError::EmptySelection {
                stage: kind.name().to_string(),
                context: format!("output {}", output),
            });
        }
        options.validate(kind)?;

        let operation = self
            .registry
            .get(kind)
            .ok_or_else(|| external(kind, OperationError::NotRegistered))?;

        let call = StageCall::new(kind, inputs, output, options);
        let outputs = call.outputs();
        {
            let mut seen = HashSet::with_capacity(outputs.len());
            for (name, _) in &outputs {
                if self.ledger.contains(name) || !seen.insert(name) {
                    return Err(PipelineError::DuplicateArtifact(name.to_string()));
                }
            }
        }
        debug!(task = kind.name(), inputs = call.inputs.len(), "invoking operation");

        self.invocations += 1;
        operation
            .execute(&call)
            .map_err(|source| external(kind, source))?;

        let option_refs: Vec<String> = call
            .options
            .artifacts()
            .map(|name| name.to_string())
            .collect();

        let mut produced = Vec::with_capacity(outputs.len());
        for (name, source) in outputs {
            let mut consumed: Vec<String> = match source {
                Some(input) => vec![input.as_str().to_string()],
                None => call.inputs.iter().map(|i| i.as_str().to_string()).collect(),
            };
            consumed.extend(option_refs.iter().cloned());

            self.ledger.register(Artifact {
                name: name.clone(),
                stage: kind,
                consumed,
            })?;
            produced.push(name);
        }

        info!(task = kind.name(), produced = %call.output_list(), "stage complete");
        Ok(produced)
    }

    /// Invoke with a single named output.
    pub fn invoke_named(
        &mut self,
        kind: StageKind,
        inputs: Vec<StageInput>,
        output: impl Into<String>,
        options: StageOptions,
    ) -> Result<ArtifactName> {
        let name = ArtifactName::new(output);
        self.invoke(kind, inputs, OutputSpec::Named(name.clone()), options)?;
        Ok(name)
    }
}

fn external(kind: StageKind, source: OperationError) -> PipelineError {
    PipelineError::ExternalOperation {
        task: kind.name().to_string(),
        source,
    }
}
