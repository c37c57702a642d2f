//! Operations backed by an external task runner.

use super::traits::{Operation, OperationError, StageCall, StageKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info};

/// How the external task runner is launched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Program receiving `<task> <inputs> <outputs> key=value...`.
    pub program: PathBuf,
    /// Working directory of the child process.
    pub working_dir: Option<PathBuf>,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("gmos-task"),
            working_dir: None,
        }
    }
}

impl CommandConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            working_dir: None,
        }
    }
}

/// Runs one task kind through the configured program and waits for it.
pub struct CommandOperation {
    kind: StageKind,
    config: CommandConfig,
}

impl CommandOperation {
    pub fn new(kind: StageKind, config: CommandConfig) -> Self {
        Self { kind, config }
    }

    /// Argument vector passed to the program.
    pub fn arguments(&self, call: &StageCall) -> Vec<String> {
        let mut args = vec![
            call.kind.name().to_string(),
            call.input_list(),
            call.output_list(),
        ];
        args.extend(call.options.render());
        args
    }
}

impl Operation for CommandOperation {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn execute(&self, call: &StageCall) -> Result<(), OperationError> {
        let args = self.arguments(call);
        let program = self.config.program.display().to_string();
        debug!(program = %program, args = ?args, "launching task");

        let mut command = Command::new(&self.config.program);
        command.args(&args);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .map_err(|source| OperationError::Launch { program, source })?;

        if !output.status.success() {
            return Err(OperationError::Failed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(task = self.kind.name(), outputs = %call.output_list(), "task finished");
        Ok(())
    }
}
