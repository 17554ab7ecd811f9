//! Error types for the interface tester.
//!
//! Every failure mode surfaces to the caller of `run()`; none are swallowed.
//! Non-fatal conditions are reported as diagnostics instead.

use std::fmt;

use thiserror::Error;

use crate::types::{FailureRecord, Role};

/// Structural configuration problems, all of them at once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigurationError {
    /// Every violation found, in check order.
    pub violations: Vec<String>,
}

impl ConfigurationError {
    /// Wrap a non-empty list of violations.
    pub fn new(violations: Vec<String>) -> Self {
        Self { violations }
    }
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "interface tester is misconfigured:")?;
        for violation in &self.violations {
            writeln!(f, "  - {}", violation)?;
        }
        write!(f, "please use the configure() API to provide the missing pieces.")
    }
}

impl std::error::Error for ConfigurationError {}

/// Errors that can occur while synthesizing or running scenarios.
#[derive(Debug, Error)]
pub enum TesterError {
    /// Configuration is structurally invalid.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// The contract source, or its expected path, could not be fetched.
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// Implementation metadata could not be located.
    #[error("Metadata discovery failed: {0}")]
    Discovery(String),

    /// A test case's event or input state is malformed or ambiguous.
    #[error("Invalid test case: {0}")]
    InvalidTestCase(String),

    /// No endpoint is available to synthesize the relation under test.
    #[error("no endpoint found for {role}/{interface}")]
    NoEndpoint { role: Role, interface: String },

    /// Several endpoints could carry the relation under test.
    #[error(
        "multiple endpoints found for {role}/{interface}: {endpoints:?}: \
         cannot guess which one is under test"
    )]
    AmbiguousEndpoint {
        role: Role,
        interface: String,
        endpoints: Vec<String>,
    },

    /// The implementation declares no endpoint for the interface in either role.
    #[error("implementation does not declare any endpoint using {interface}")]
    NoSupportedEndpoints { interface: String },

    /// A merged state lacks the relation under test.
    #[error("merged state carries no relation for {interface}")]
    MissingRelationUnderTest { interface: String },

    /// One or more scenarios reported failures.
    #[error("interface tests completed with {} failure(s): {}", .0.len(), render_failures(.0))]
    ScenariosFailed(Vec<FailureRecord>),

    /// Nothing was run.
    #[error("no tests gathered for {interface}/v{version}")]
    NoScenarios { interface: String, version: u32 },

    /// A contract or metadata document could not be parsed.
    #[error("Parse error in {path}: {reason}")]
    Parse { path: String, reason: String },

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn render_failures(failures: &[FailureRecord]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl TesterError {
    /// Failure records carried by [`TesterError::ScenariosFailed`].
    pub fn failures(&self) -> &[FailureRecord] {
        match self {
            Self::ScenariosFailed(failures) => failures,
            _ => &[],
        }
    }
}

/// Result type for interface tester operations.
pub type TesterResult<T> = Result<T, TesterError>;
