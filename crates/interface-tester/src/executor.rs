//! Scenario executor trait and simulated implementation.
//!
//! The `ScenarioExecutor` trait abstracts running the implementation under
//! test against one synthesized scenario and checking its relation data
//! against the contract schema. Real implementations drive an external
//! harness; the `SimulatedExecutor` returns configurable failures and records
//! what it was asked to run.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::event::Event;
use crate::metadata::CharmMetadata;
use crate::scenario::Scenario;
use crate::types::{FailureRecord, ImplementationDescriptor, Role, Schema, State, TestCase};

// ── Execution request ──────────────────────────────────────────────────

/// Everything an executor needs to run one scenario.
#[derive(Clone, Debug, Serialize)]
pub struct ExecutionRequest<'a> {
    pub test: &'a TestCase,
    pub role: Role,
    pub schema: &'a Schema,
    pub event: &'a Event,
    pub state: &'a State,
    pub interface_name: &'a str,
    pub implementation: &'a ImplementationDescriptor,
    pub meta: &'a CharmMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<&'a serde_json::Value>,
}

impl<'a> ExecutionRequest<'a> {
    /// Request for `scenario` under a resolved configuration.
    pub fn new(scenario: &'a Scenario, config: &'a ResolvedConfig) -> Self {
        Self {
            test: &scenario.test,
            role: scenario.role,
            schema: &scenario.schema,
            event: &scenario.event,
            state: &scenario.state,
            interface_name: &config.interface_name,
            implementation: &config.implementation,
            meta: &config.charm.meta,
            config: config.charm.config.as_ref(),
            actions: config.charm.actions.as_ref(),
        }
    }
}

// ── ScenarioExecutor Trait ─────────────────────────────────────────────

/// Runs the implementation under test against a scenario.
pub trait ScenarioExecutor: Send + Sync {
    /// Execute one scenario; an empty list means it passed.
    fn execute(&self, request: &ExecutionRequest<'_>) -> Vec<FailureRecord>;

    /// Name of this executor for logging.
    fn name(&self) -> &str;
}

impl<E: ScenarioExecutor + ?Sized> ScenarioExecutor for Arc<E> {
    fn execute(&self, request: &ExecutionRequest<'_>) -> Vec<FailureRecord> {
        (**self).execute(request)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ── Simulated executor ─────────────────────────────────────────────────

/// A simulated executor for testing.
///
/// Passes every scenario except the named test cases, and keeps the names of
/// executed test cases in call order.
#[derive(Debug, Default)]
pub struct SimulatedExecutor {
    failing: BTreeSet<String>,
    executed: Mutex<Vec<String>>,
}

impl SimulatedExecutor {
    /// An executor that passes everything.
    pub fn passing() -> Self {
        Self::default()
    }

    /// An executor that fails the named test cases.
    pub fn failing_tests<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing: names.into_iter().map(Into::into).collect(),
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Names of executed test cases, in order.
    pub fn executed(&self) -> Vec<String> {
        match self.executed.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ScenarioExecutor for SimulatedExecutor {
    fn execute(&self, request: &ExecutionRequest<'_>) -> Vec<FailureRecord> {
        let name = request.test.name.clone();
        match self.executed.lock() {
            Ok(mut log) => log.push(name.clone()),
            Err(poisoned) => poisoned.into_inner().push(name.clone()),
        }

        if self.failing.contains(&name) {
            vec![FailureRecord::new(
                name,
                format!(
                    "simulated failure for {} on {}",
                    request.role, request.interface_name
                ),
            )]
        } else {
            Vec::new()
        }
    }

    fn name(&self) -> &str {
        "simulated-executor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContractSource;
    use crate::metadata::ResolvedCharmSpec;

    fn config() -> ResolvedConfig {
        ResolvedConfig {
            implementation: ImplementationDescriptor::new("app"),
            source: ContractSource::default(),
            interface_name: "db".into(),
            interface_version: 0,
            state_template: State::new(),
            charm: ResolvedCharmSpec {
                meta: CharmMetadata::new(),
                actions: None,
                config: Some(serde_json::json!({"options": {}})),
            },
        }
    }

    fn scenario(name: &str) -> Scenario {
        Scenario {
            role: Role::Requirer,
            test: TestCase::new(name, "start"),
            schema: Schema::default(),
            event: Event::new("start"),
            state: State::new(),
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn request_borrows_scenario_and_config() {
        let config = config();
        let scenario = scenario("t1");
        let request = ExecutionRequest::new(&scenario, &config);
        assert_eq!(request.interface_name, "db");
        assert_eq!(request.implementation.name, "app");
        assert!(request.actions.is_none());

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["test"]["name"], "t1");
        assert_eq!(json["role"], "requirer");
        assert_eq!(json["event"]["name"], "start");
        assert!(json.get("actions").is_none());
        assert!(json["config"]["options"].is_object());
    }

    #[test]
    fn passing_executor_records_calls() {
        let executor = SimulatedExecutor::passing();
        let config = config();
        for name in ["a", "b"] {
            let scenario = scenario(name);
            assert!(executor.execute(&ExecutionRequest::new(&scenario, &config)).is_empty());
        }
        assert_eq!(executor.executed(), vec!["a", "b"]);
    }

    #[test]
    fn failing_executor_fails_only_named_tests() {
        let executor = SimulatedExecutor::failing_tests(["b"]);
        let config = config();
        let a = scenario("a");
        let b = scenario("b");
        assert!(executor.execute(&ExecutionRequest::new(&a, &config)).is_empty());
        let failures = executor.execute(&ExecutionRequest::new(&b, &config));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].test, "b");
        assert!(failures[0].message.contains("requirer"));
    }
}
