//! Executor backed by an external program.
//!
//! The program receives one JSON-serialized [`ExecutionRequest`] on stdin and
//! prints a JSON list of failure messages on stdout (empty output or `[]`
//! means the scenario passed). A non-zero exit status is itself a failure.
//! Programs that ignore stdin are fine.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use anyhow::Context;
use interface_tester::{ExecutionRequest, FailureRecord, ScenarioExecutor};
use tracing::debug;

/// Runs each scenario by spawning an external program.
#[derive(Clone, Debug)]
pub struct CommandExecutor {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandExecutor {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn try_execute(&self, request: &ExecutionRequest<'_>) -> anyhow::Result<Vec<FailureRecord>> {
        let test = &request.test.name;
        let payload = serde_json::to_vec(request).context("cannot serialize scenario")?;

        debug!(program = %self.program.display(), test = %test, "spawning executor");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("cannot start {}", self.program.display()))?;

        // Stdin is fed on its own thread while stdout and stderr drain.
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || match stdin.write_all(&payload) {
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            })
        });
        let output = child
            .wait_with_output()
            .context("executor did not complete")?;
        if let Some(writer) = writer {
            writer
                .join()
                .map_err(|_| anyhow::anyhow!("stdin writer panicked"))?
                .context("cannot send scenario to executor")?;
        }

        let mut failures = Vec::new();
        if !output.status.success() {
            failures.push(FailureRecord::new(
                test.clone(),
                format!(
                    "executor exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if !stdout.is_empty() {
            let messages: Vec<String> = serde_json::from_str(stdout).with_context(|| {
                format!("executor output is not a JSON list of messages: {}", stdout)
            })?;
            failures.extend(
                messages
                    .into_iter()
                    .map(|message| FailureRecord::new(test.clone(), message)),
            );
        }
        Ok(failures)
    }
}

impl ScenarioExecutor for CommandExecutor {
    fn execute(&self, request: &ExecutionRequest<'_>) -> Vec<FailureRecord> {
        match self.try_execute(request) {
            Ok(failures) => failures,
            Err(e) => vec![FailureRecord::new(request.test.name.clone(), format!("{:#}", e))],
        }
    }

    fn name(&self) -> &str {
        "command"
    }
}
