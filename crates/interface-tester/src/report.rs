//! Run reports.
//!
//! A `RunReport` records every executed scenario and the diagnostics
//! gathered while synthesizing them, with a box-drawing summary display.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diagnostics::{count_at_least, Diagnostic, DiagnosticLevel};
use crate::error::{TesterError, TesterResult};
use crate::types::{FailureRecord, Role};

/// Unique identifier for a test run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new unique run ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run:{}", self.0)
    }
}

/// Result of executing one scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// Test case name.
    pub test: String,
    /// Role the scenario exercised.
    pub role: Role,
    /// Name of the event fired.
    pub event: String,
    /// Failures reported by the executor; empty when the scenario passed.
    pub failures: Vec<FailureRecord>,
}

impl ScenarioOutcome {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for ScenarioOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.passed() { "+" } else { "x" };
        write!(f, "[{}] {} ({}, {})", mark, self.test, self.role, self.event)
    }
}

/// Everything that happened during one run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub id: RunId,
    pub interface: String,
    pub version: u32,
    pub outcomes: Vec<ScenarioOutcome>,
    pub diagnostics: Vec<Diagnostic>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunReport {
    /// Start a report for `interface` at `version`.
    pub fn start(interface: impl Into<String>, version: u32) -> Self {
        Self {
            id: RunId::new(),
            interface: interface.into(),
            version,
            outcomes: Vec::new(),
            diagnostics: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Mark the run complete.
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    /// Whether at least one scenario ran.
    pub fn ran_some(&self) -> bool {
        !self.outcomes.is_empty()
    }

    /// Whether every executed scenario passed.
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(ScenarioOutcome::passed)
    }

    /// All failure records, in execution order.
    pub fn failures(&self) -> Vec<FailureRecord> {
        self.outcomes
            .iter()
            .flat_map(|o| o.failures.iter().cloned())
            .collect()
    }

    /// Number of scenarios that failed.
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed()).count()
    }

    /// Judge the run.
    ///
    /// Fails with [`TesterError::ScenariosFailed`] carrying every failure
    /// record if any scenario failed, or with [`TesterError::NoScenarios`]
    /// if nothing ran.
    pub fn verdict(&self) -> TesterResult<()> {
        let failures = self.failures();
        if !failures.is_empty() {
            return Err(TesterError::ScenariosFailed(failures));
        }
        if !self.ran_some() {
            return Err(TesterError::NoScenarios {
                interface: self.interface.clone(),
                version: self.version,
            });
        }
        Ok(())
    }

    /// Wall-clock duration, once complete.
    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.outcomes.len();
        let failed = self.failed_count();
        writeln!(f, "+-------------------------------------------------+")?;
        writeln!(f, "|   Interface Test Report                         |")?;
        writeln!(f, "+-------------------------------------------------+")?;
        writeln!(f, "| Interface: {:<37}|", format!("{}/v{}", self.interface, self.version))?;
        writeln!(
            f,
            "| Total: {:3}  Passed: {:3}  Failed: {:3}             |",
            total,
            total - failed,
            failed,
        )?;
        writeln!(f, "+-------------------------------------------------+")?;

        for outcome in &self.outcomes {
            writeln!(f, "  {}", outcome)?;
            for failure in &outcome.failures {
                writeln!(f, "      - {}", failure.message)?;
            }
        }

        let warnings = count_at_least(&self.diagnostics, DiagnosticLevel::Warning);
        if warnings > 0 {
            writeln!(f)?;
            writeln!(f, "  Warnings ({}):", warnings)?;
            for d in self
                .diagnostics
                .iter()
                .filter(|d| d.level >= DiagnosticLevel::Warning)
            {
                writeln!(f, "    {}", d)?;
            }
        }

        writeln!(f)?;
        write!(f, "  {}", self.id)?;
        if let Some(ms) = self.duration_ms() {
            write!(f, " ({} ms)", ms)?;
        }
        writeln!(f)
    }
}
