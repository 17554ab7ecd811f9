//! Relation interface conformance tester.
//!
//! Runs an implementation against the contract tests published for one of
//! the relation interfaces it declares. A contract is a versioned set of
//! per-role test cases plus a data schema, authored independently of any
//! implementation. For every test case the tester synthesizes a scenario
//! (merged state, relation under test, canonical event), hands it to a
//! [`ScenarioExecutor`], and aggregates the results.
//!
//! # Architecture
//!
//! ```text
//! InterfaceTester::run()
//!   ├─ TesterSettings::resolve()       validate config, resolve metadata once
//!   ├─ SpecSource::fetch()             contract tests for interface/version
//!   └─ ScenarioIter (lazy)
//!        ├─ resolve_endpoints()        endpoints per role
//!        ├─ ScenarioMerger::merge()    exactly one relation under test
//!        └─ event::normalize()         canonical event bound to that relation
//!      → ScenarioExecutor::execute()   per scenario, never fail-fast
//!      → RunReport::verdict()          ScenariosFailed / NoScenarios / ok
//! ```
//!
//! # Usage
//!
//! ```rust
//! use interface_tester::{
//!     CharmMetadata, InMemorySpecSource, ImplementationDescriptor, InterfaceTestSpec,
//!     InterfaceTester, Role, RoleTestSpec, Schema, SimulatedExecutor, StaticMetadataProvider,
//!     TestCase, TesterOptions,
//! };
//!
//! let spec = InterfaceTestSpec {
//!     provider: RoleTestSpec::new(
//!         vec![TestCase::new("publishes_endpoint", "database-relation-joined")],
//!         Schema::default(),
//!     ),
//!     requirer: RoleTestSpec::default(),
//! };
//!
//! let mut tester = InterfaceTester::new(Box::new(SimulatedExecutor::passing()))
//!     .with_spec_source(Box::new(InMemorySpecSource::new().with_spec("mysql_client", 0, spec)))
//!     .with_metadata_provider(Box::new(StaticMetadataProvider::empty()));
//! tester.configure(
//!     TesterOptions::new()
//!         .implementation(ImplementationDescriptor::new("mysql"))
//!         .interface_name("mysql_client")
//!         .meta(CharmMetadata::new().with_endpoint(Role::Provider, "database", "mysql_client")),
//! );
//!
//! assert!(tester.run().unwrap());
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod executor;
pub mod merger;
pub mod metadata;
pub mod report;
pub mod resolver;
pub mod scenario;
pub mod source;
pub mod tester;
pub mod types;

pub use config::{ContractSource, Lenient, ResolvedConfig, TesterOptions, TesterSettings};
pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticLevel};
pub use error::{ConfigurationError, TesterError, TesterResult};
pub use event::{normalize, Event, EventKind, RawEvent, RelationEventKind};
pub use executor::{ExecutionRequest, ScenarioExecutor, SimulatedExecutor};
pub use merger::{MergeOutcome, ScenarioMerger};
pub use metadata::{
    CharmDirMetadataProvider, CharmMetadata, EndpointSpec, MetadataProvider, ResolvedCharmSpec,
    StaticMetadataProvider,
};
pub use report::{RunId, RunReport, ScenarioOutcome};
pub use resolver::{resolve_endpoints, EndpointResolution, SupportedEndpoints};
pub use scenario::{Scenario, ScenarioIter};
pub use source::{DirectorySpecSource, GitSpecSource, InMemorySpecSource, SpecSource};
pub use tester::InterfaceTester;
pub use types::{
    DataBag, FailureRecord, ImplementationDescriptor, InterfaceTestSpec, Relation, Role,
    RoleTestSpec, Schema, State, TestCase,
};
