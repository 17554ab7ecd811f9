//! Core value types for interface conformance testing.
//!
//! Defines roles, relations, states, schemas, test cases, and the per-role
//! test specification bundles produced by a contract source. All of these are
//! value objects: a scenario gets fresh copies, and merging produces new
//! instances instead of mutating existing ones.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::event::RawEvent;

/// Key/value databag attached to one side of a relation.
pub type DataBag = BTreeMap<String, String>;

fn default_remote_app_name() -> String {
    "remote".into()
}

// ── Role ───────────────────────────────────────────────────────────────

/// One of the two symmetric parties in an interface relationship.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The providing side (`provides` in charm metadata).
    Provider,
    /// The requiring side (`requires` in charm metadata).
    Requirer,
}

impl Role {
    /// Both roles in canonical order.
    pub fn all() -> &'static [Role] {
        &[Self::Provider, Self::Requirer]
    }

    /// Lowercase role name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::Requirer => "requirer",
        }
    }

    /// The metadata section declaring endpoints for this role.
    pub fn meta_key(&self) -> &'static str {
        match self {
            Self::Provider => "provides",
            Self::Requirer => "requires",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Relation ───────────────────────────────────────────────────────────

/// A relation entry in a scenario state.
///
/// Identity within a [`State`] is by endpoint and interface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Relation {
    /// Endpoint name as declared in the implementation's metadata.
    pub endpoint: String,
    /// Interface name carried by the endpoint.
    pub interface: String,
    /// Name of the application on the other side.
    #[serde(default = "default_remote_app_name")]
    pub remote_app_name: String,
    /// Application databag written by the implementation under test.
    #[serde(default)]
    pub local_app_data: DataBag,
    /// Application databag written by the remote side.
    #[serde(default)]
    pub remote_app_data: DataBag,
    /// Unit databag written by the implementation under test.
    #[serde(default)]
    pub local_unit_data: DataBag,
    /// Unit databags written by remote units, keyed by unit id (`"0"`).
    #[serde(default)]
    pub remote_units_data: BTreeMap<String, DataBag>,
}

impl Relation {
    /// Create an empty relation for an endpoint.
    pub fn new(interface: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            interface: interface.into(),
            remote_app_name: default_remote_app_name(),
            local_app_data: DataBag::new(),
            remote_app_data: DataBag::new(),
            local_unit_data: DataBag::new(),
            remote_units_data: BTreeMap::new(),
        }
    }

    /// Set the remote application databag.
    pub fn with_remote_app_data(mut self, data: DataBag) -> Self {
        self.remote_app_data = data;
        self
    }

    /// Set the local application databag.
    pub fn with_local_app_data(mut self, data: DataBag) -> Self {
        self.local_app_data = data;
        self
    }

    /// Copy of this relation bound to a different endpoint.
    pub fn rebound_to(&self, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..self.clone()
        }
    }

    /// Whether this relation carries the given interface.
    pub fn carries(&self, interface: &str) -> bool {
        self.interface == interface
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.endpoint, self.interface)
    }
}

// ── State ──────────────────────────────────────────────────────────────

/// Immutable snapshot a scenario runs against.
///
/// Copy-on-write: [`State::with_relations`] returns a new state and leaves
/// the receiver untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct State {
    /// Relations known to the implementation.
    #[serde(default)]
    pub relations: Vec<Relation>,
    /// Implementation configuration values.
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
    /// Whether the unit under test is the leader.
    #[serde(default)]
    pub leader: bool,
    /// Any other implementation-specific context.
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl State {
    /// An empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// A state containing only the given relations.
    pub fn from_relations(relations: Vec<Relation>) -> Self {
        Self {
            relations,
            ..Self::default()
        }
    }

    /// New state with the relation set replaced and all other context kept.
    pub fn with_relations(&self, relations: Vec<Relation>) -> Self {
        Self {
            relations,
            config: self.config.clone(),
            leader: self.leader,
            context: self.context.clone(),
        }
    }

    /// Set the leader flag.
    pub fn with_leader(mut self, leader: bool) -> Self {
        self.leader = leader;
        self
    }

    /// Relations carrying the given interface, in state order.
    pub fn relations_for<'a>(
        &'a self,
        interface: &'a str,
    ) -> impl Iterator<Item = &'a Relation> + 'a {
        self.relations.iter().filter(move |r| r.carries(interface))
    }
}

// ── Schema ─────────────────────────────────────────────────────────────

/// Databag schema a role must satisfy.
///
/// Opaque to the engine; evaluated by the executor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(pub serde_json::Value);

impl Schema {
    /// Whether no schema was declared.
    pub fn is_empty(&self) -> bool {
        self.0.is_null()
    }
}

// ── Test cases and specs ───────────────────────────────────────────────

/// A single contract test case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestCase {
    /// Test case name, unique within its role.
    pub name: String,
    /// State fragment the contract needs, typically relation data for the
    /// interface under test.
    #[serde(default)]
    pub input_state: Option<State>,
    /// Event to fire, as shorthand or structured.
    pub event: RawEvent,
}

impl TestCase {
    /// Create a test case firing `event` with no input state.
    pub fn new(name: impl Into<String>, event: impl Into<RawEvent>) -> Self {
        Self {
            name: name.into(),
            input_state: None,
            event: event.into(),
        }
    }

    /// Attach an input state.
    pub fn with_input_state(mut self, state: State) -> Self {
        self.input_state = Some(state);
        self
    }
}

/// Test cases and schema for one role.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleTestSpec {
    /// Ordered test cases.
    #[serde(default)]
    pub tests: Vec<TestCase>,
    /// Schema the role's databags must satisfy.
    #[serde(default)]
    pub schema: Schema,
}

impl RoleTestSpec {
    /// Create a spec from tests and a schema.
    pub fn new(tests: Vec<TestCase>, schema: Schema) -> Self {
        Self { tests, schema }
    }
}

/// Both roles' test specs for one interface version.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceTestSpec {
    /// Tests for implementations providing the interface.
    #[serde(default)]
    pub provider: RoleTestSpec,
    /// Tests for implementations requiring the interface.
    #[serde(default)]
    pub requirer: RoleTestSpec,
}

impl InterfaceTestSpec {
    /// Spec for one role.
    pub fn role(&self, role: Role) -> &RoleTestSpec {
        match role {
            Role::Provider => &self.provider,
            Role::Requirer => &self.requirer,
        }
    }

    /// Take ownership of one role's spec, leaving an empty one behind.
    pub fn take_role(&mut self, role: Role) -> RoleTestSpec {
        match role {
            Role::Provider => std::mem::take(&mut self.provider),
            Role::Requirer => std::mem::take(&mut self.requirer),
        }
    }

    /// Whether neither role defines any test case.
    pub fn has_no_tests(&self) -> bool {
        self.provider.tests.is_empty() && self.requirer.tests.is_empty()
    }
}

// ── Implementation descriptor ──────────────────────────────────────────

/// Identifies the implementation (charm) under test.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImplementationDescriptor {
    /// Implementation name.
    pub name: String,
    /// Source root, used for metadata autoloading.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

impl ImplementationDescriptor {
    /// Descriptor with no known source root.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: None,
        }
    }

    /// Set the source root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }
}

impl fmt::Display for ImplementationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            Some(root) => write!(f, "{} ({})", self.name, root.display()),
            None => f.write_str(&self.name),
        }
    }
}

// ── Failure record ─────────────────────────────────────────────────────

/// A failure reported by the executor for one scenario.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Name of the failing test case.
    pub test: String,
    /// What went wrong.
    pub message: String,
}

impl FailureRecord {
    /// Create a failure record.
    pub fn new(test: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            test: test.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.test, self.message)
    }
}
