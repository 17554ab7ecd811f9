//! Interface tester: orchestrator for a conformance run.
//!
//! The `InterfaceTester` drives one run end to end:
//! 1. Validate the accumulated configuration (resolving metadata once)
//! 2. Fetch the contract test spec for the interface version
//! 3. Plan scenarios for every supported role
//! 4. Execute each scenario, collecting failures without stopping
//! 5. Judge the run: failures, nothing to verify, or success

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::{ResolvedConfig, TesterOptions, TesterSettings};
use crate::error::TesterResult;
use crate::executor::{ExecutionRequest, ScenarioExecutor};
use crate::metadata::{CharmDirMetadataProvider, MetadataProvider};
use crate::report::{RunReport, ScenarioOutcome};
use crate::scenario::{Scenario, ScenarioIter};
use crate::source::{GitSpecSource, SpecSource};

/// Conformance tester for one implementation and one interface.
///
/// Configuration accumulates through [`configure`](Self::configure) and is
/// only validated when a run (or [`validate`](Self::validate)) is requested.
pub struct InterfaceTester {
    settings: TesterSettings,
    source: Box<dyn SpecSource>,
    metadata_provider: Box<dyn MetadataProvider>,
    executor: Box<dyn ScenarioExecutor>,
}

impl InterfaceTester {
    /// Tester that clones contracts with git and autoloads metadata from the
    /// implementation's source root.
    pub fn new(executor: Box<dyn ScenarioExecutor>) -> Self {
        Self {
            settings: TesterSettings::default(),
            source: Box::new(GitSpecSource::new()),
            metadata_provider: Box::new(CharmDirMetadataProvider::new()),
            executor,
        }
    }

    /// Replace the contract spec source.
    pub fn with_spec_source(mut self, source: Box<dyn SpecSource>) -> Self {
        self.source = source;
        self
    }

    /// Replace the metadata provider.
    pub fn with_metadata_provider(mut self, provider: Box<dyn MetadataProvider>) -> Self {
        self.metadata_provider = provider;
        self
    }

    /// Apply a partial configuration update.
    pub fn configure(&mut self, options: TesterOptions) -> &mut Self {
        self.settings.apply(options);
        self
    }

    /// Configuration accumulated so far.
    pub fn settings(&self) -> &TesterSettings {
        &self.settings
    }

    /// Validate the configuration, reporting every violation at once.
    pub fn validate(&self) -> TesterResult<ResolvedConfig> {
        let config = self.settings.resolve(self.metadata_provider.as_ref())?;
        debug!(
            interface = %config.interface_name,
            version = config.interface_version,
            provider = self.metadata_provider.name(),
            "configuration validated"
        );
        Ok(config)
    }

    /// Validate, fetch, and plan scenarios without executing them.
    pub fn scenarios(&self) -> TesterResult<(ResolvedConfig, ScenarioIter)> {
        let config = self.validate()?;
        let iter = self.plan(&config)?;
        Ok((config, iter))
    }

    /// Synthesize every scenario eagerly.
    pub fn collect_scenarios(&self) -> TesterResult<Vec<Scenario>> {
        let (config, iter) = self.scenarios()?;
        for diagnostic in iter.diagnostics() {
            diagnostic.emit(&config.interface_name);
        }
        iter.collect()
    }

    /// Run every scenario and return the report, whatever the outcome.
    ///
    /// Fails only on configuration, retrieval, or synthesis errors. Executor
    /// failures are recorded in the report; see [`RunReport::verdict`].
    pub fn execute(&self) -> TesterResult<RunReport> {
        let config = self.validate()?;
        info!(
            interface = %config.interface_name,
            version = config.interface_version,
            implementation = %config.implementation,
            source = self.source.name(),
            executor = self.executor.name(),
            "Running interface tests"
        );

        let mut report = RunReport::start(&config.interface_name, config.interface_version);
        let scenarios = self.plan(&config)?;
        for diagnostic in scenarios.diagnostics() {
            diagnostic.emit(&config.interface_name);
        }
        report.diagnostics.extend_from_slice(scenarios.diagnostics());

        for scenario in scenarios {
            let scenario = scenario?;
            for diagnostic in &scenario.diagnostics {
                diagnostic.emit(&config.interface_name);
            }

            let failures = self
                .executor
                .execute(&ExecutionRequest::new(&scenario, &config));
            if failures.is_empty() {
                debug!(test = %scenario.test.name, role = %scenario.role, "Scenario passed");
            } else {
                warn!(
                    test = %scenario.test.name,
                    role = %scenario.role,
                    failures = failures.len(),
                    "Scenario failed"
                );
            }

            let Scenario {
                role,
                test,
                event,
                diagnostics,
                ..
            } = scenario;
            report.diagnostics.extend(diagnostics);
            report.outcomes.push(ScenarioOutcome {
                test: test.name,
                role,
                event: event.name,
                failures,
            });
        }

        report.complete();
        info!(
            run = %report.id,
            executed = report.outcomes.len(),
            failed = report.failed_count(),
            "Interface tests complete"
        );
        Ok(report)
    }

    /// Run every scenario and judge the outcome.
    pub fn run_report(&self) -> TesterResult<RunReport> {
        let report = self.execute()?;
        report.verdict()?;
        Ok(report)
    }

    /// Run every scenario; `Ok(true)` when at least one ran and none failed.
    pub fn run(&self) -> TesterResult<bool> {
        Ok(self.run_report()?.ran_some())
    }

    fn plan(&self, config: &ResolvedConfig) -> TesterResult<ScenarioIter> {
        let spec = self
            .source
            .fetch(&config.source, &config.interface_name, config.interface_version)?;
        ScenarioIter::plan(
            spec,
            &config.charm.meta,
            config.state_template.clone(),
            &config.interface_name,
        )
    }
}

impl fmt::Display for InterfaceTester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.settings)?;
        write!(
            f,
            "  (source={}, metadata={}, executor={})",
            self.source.name(),
            self.metadata_provider.name(),
            self.executor.name()
        )
    }
}

impl fmt::Debug for InterfaceTester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceTester")
            .field("settings", &self.settings)
            .field("source", &self.source.name())
            .field("metadata_provider", &self.metadata_provider.name())
            .field("executor", &self.executor.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::TesterError;
    use crate::event::{Event, RawEvent};
    use crate::executor::SimulatedExecutor;
    use crate::metadata::{CharmMetadata, ResolvedCharmSpec, StaticMetadataProvider};
    use crate::source::InMemorySpecSource;
    use crate::types::{
        FailureRecord, ImplementationDescriptor, InterfaceTestSpec, Role, RoleTestSpec, Schema,
        TestCase,
    };

    const IFACE: &str = "db";

    fn meta() -> CharmMetadata {
        CharmMetadata::new()
            .with_endpoint(Role::Provider, "database", IFACE)
            .with_endpoint(Role::Requirer, "upstream", IFACE)
    }

    fn spec(provider: Vec<TestCase>, requirer: Vec<TestCase>) -> InterfaceTestSpec {
        InterfaceTestSpec {
            provider: RoleTestSpec::new(provider, Schema::default()),
            requirer: RoleTestSpec::new(requirer, Schema::default()),
        }
    }

    fn tester(
        executor: &Arc<SimulatedExecutor>,
        version: u32,
        spec: InterfaceTestSpec,
    ) -> InterfaceTester {
        let mut tester = InterfaceTester::new(Box::new(executor.clone()))
            .with_spec_source(Box::new(InMemorySpecSource::new().with_spec(IFACE, version, spec)))
            .with_metadata_provider(Box::new(StaticMetadataProvider::empty()));
        tester.configure(
            TesterOptions::new()
                .implementation(ImplementationDescriptor::new("app"))
                .interface_name(IFACE)
                .interface_version(version)
                .meta(meta()),
        );
        tester
    }

    #[test]
    fn zero_test_cases_is_no_scenarios() {
        let executor = Arc::new(SimulatedExecutor::passing());
        let tester = tester(&executor, 0, spec(vec![], vec![]));
        let err = tester.run().unwrap_err();
        assert!(matches!(err, TesterError::NoScenarios { version: 0, .. }));
        assert!(executor.executed().is_empty());
    }

    #[test]
    fn failures_are_collected_after_every_scenario_ran() {
        let executor = Arc::new(SimulatedExecutor::failing_tests(["second"]));
        let tester = tester(
            &executor,
            1,
            spec(
                vec![
                    TestCase::new("first", "database-relation-joined"),
                    TestCase::new("second", "database-relation-changed"),
                ],
                vec![TestCase::new("third", "upstream-relation-joined")],
            ),
        );

        let err = tester.run().unwrap_err();
        assert_eq!(executor.executed(), vec!["first", "second", "third"]);
        match err {
            TesterError::ScenariosFailed(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].test, "second");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn passing_run_returns_true() {
        let executor = Arc::new(SimulatedExecutor::passing());
        let tester = tester(&executor, 0, spec(vec![TestCase::new("p", "start")], vec![]));
        assert!(tester.run().unwrap());
        assert_eq!(executor.executed(), vec!["p"]);
    }

    #[test]
    fn execute_keeps_report_on_failure() {
        let executor = Arc::new(SimulatedExecutor::failing_tests(["p"]));
        let tester = tester(&executor, 0, spec(vec![TestCase::new("p", "start")], vec![]));
        let report = tester.execute().unwrap();
        assert_eq!(
            report.failures(),
            vec![FailureRecord::new("p", "simulated failure for provider on db")]
        );
        assert!(report.completed_at.is_some());
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.code == crate::diagnostics::DiagnosticCode::RelationSynthesized));
    }

    #[test]
    fn configure_accumulates_and_accepts_version_zero() {
        let executor = Arc::new(SimulatedExecutor::passing());
        let mut tester = tester(&executor, 0, spec(vec![TestCase::new("p", "start")], vec![]));
        tester.configure(TesterOptions::new().interface_version(3));
        assert_eq!(tester.validate().unwrap().interface_version, 3);

        tester.configure(TesterOptions::new().interface_version(0));
        let config = tester.validate().unwrap();
        assert_eq!(config.interface_version, 0);
        assert_eq!(config.interface_name, IFACE);
        assert!(tester.run().unwrap());
    }

    #[test]
    fn misconfiguration_fails_before_any_work() {
        let executor = Arc::new(SimulatedExecutor::passing());
        let tester = InterfaceTester::new(Box::new(executor.clone()))
            .with_spec_source(Box::new(InMemorySpecSource::new()))
            .with_metadata_provider(Box::new(StaticMetadataProvider::empty()));
        let err = tester.run().unwrap_err();
        match err {
            TesterError::Configuration(e) => assert_eq!(e.violations.len(), 3),
            other => panic!("unexpected error: {other}"),
        }
        assert!(executor.executed().is_empty());
    }

    #[test]
    fn metadata_provider_is_used_when_meta_is_absent() {
        let executor = Arc::new(SimulatedExecutor::passing());
        let mut tester = InterfaceTester::new(Box::new(executor.clone()))
            .with_spec_source(Box::new(InMemorySpecSource::new().with_spec(
                IFACE,
                0,
                spec(vec![], vec![TestCase::new("r", "upstream-relation-broken")]),
            )))
            .with_metadata_provider(Box::new(StaticMetadataProvider::new(
                ResolvedCharmSpec::from_meta(meta()),
            )));
        tester.configure(
            TesterOptions::new()
                .implementation(ImplementationDescriptor::new("app"))
                .interface_name(IFACE),
        );
        assert!(tester.run().unwrap());
        assert_eq!(executor.executed(), vec!["r"]);
    }

    #[test]
    fn missing_contract_version_is_a_retrieval_error() {
        let executor = Arc::new(SimulatedExecutor::passing());
        let mut tester = tester(&executor, 0, spec(vec![], vec![]));
        tester.configure(TesterOptions::new().interface_version(7));
        assert!(matches!(tester.run().unwrap_err(), TesterError::Retrieval(_)));
    }

    #[test]
    fn invalid_test_case_aborts_the_run() {
        let executor = Arc::new(SimulatedExecutor::passing());
        let tester = tester(
            &executor,
            0,
            spec(
                vec![
                    TestCase::new("ok", "start"),
                    TestCase::new(
                        "bad",
                        RawEvent::Structured(Event::new("database-relation-joined")),
                    ),
                    TestCase::new("never", "start"),
                ],
                vec![],
            ),
        );
        let err = tester.run().unwrap_err();
        assert!(matches!(err, TesterError::InvalidTestCase(_)));
        assert_eq!(executor.executed(), vec!["ok"]);
    }

    #[test]
    fn unsupported_interface_is_a_hard_error() {
        let executor = Arc::new(SimulatedExecutor::passing());
        let mut tester = tester(&executor, 0, spec(vec![TestCase::new("p", "start")], vec![]));
        tester.configure(TesterOptions::new().meta(CharmMetadata::new()));
        assert!(matches!(
            tester.run().unwrap_err(),
            TesterError::NoSupportedEndpoints { .. }
        ));
    }

    #[test]
    fn collect_scenarios_does_not_execute() {
        let executor = Arc::new(SimulatedExecutor::passing());
        let tester = tester(
            &executor,
            0,
            spec(vec![TestCase::new("p", "start")], vec![TestCase::new("r", "start")]),
        );
        let scenarios = tester.collect_scenarios().unwrap();
        assert_eq!(scenarios.len(), 2);
        assert!(executor.executed().is_empty());
    }

    #[test]
    fn display_describes_configuration() {
        let executor = Arc::new(SimulatedExecutor::passing());
        let tester = tester(&executor, 0, spec(vec![], vec![]));
        let repr = tester.to_string();
        assert!(repr.contains("<Interface Tester:"));
        assert!(repr.contains("interface_name=\"db\""));
        assert!(repr.contains("executor=simulated-executor"));
        assert!(repr.contains("source=in-memory"));
    }
}
